use log::{debug, warn};

use crate::error::PanelError;
use crate::messages::{InboundMessage, OutboundMessage};
use crate::stats::PadStats;
use crate::welcome::WelcomeDocument;

pub trait EditorContent {
    fn content(&self) -> Option<String>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WriteId(u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Idle,
    // The next change notification is ours. `edit_in_flight` survives it.
    AwaitingOwnEcho { write: WriteId, edit_in_flight: bool },
    LocalEditInFlight,
}

impl SyncState {
    pub fn edit_in_flight(self) -> bool {
        match self {
            SyncState::Idle => false,
            SyncState::AwaitingOwnEcho { edit_in_flight, .. } => edit_in_flight,
            SyncState::LocalEditInFlight => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Rename,
    Insert,
    Other,
}

impl ChangeKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "rename" => ChangeKind::Rename,
            "insert" => ChangeKind::Insert,
            _ => ChangeKind::Other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditorChange {
    pub focused: bool,
    pub kind: ChangeKind,
}

impl EditorChange {
    pub fn new(focused: bool, kind: ChangeKind) -> Self {
        Self { focused, kind }
    }

    // Structural changes fire without focus and still have to be captured.
    pub fn qualifies(self) -> bool {
        self.focused || matches!(self.kind, ChangeKind::Rename | ChangeKind::Insert)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    SetContent(String),
    Send(OutboundMessage),
    ReadLegacyNote,
    RemoveLegacyNote,
    ReadCredentials,
    ShowAuthenticated(bool),
}

#[derive(Debug)]
pub struct Coordinator {
    welcome: WelcomeDocument,
    state: SyncState,
    next_write: u64,
    last_synced: Option<String>,
    legacy_read_pending: bool,
    migrating: Option<String>,
    mounted: bool,
}

impl Coordinator {
    pub fn new(welcome: WelcomeDocument) -> Self {
        Self {
            welcome,
            state: SyncState::Idle,
            next_write: 0,
            last_synced: None,
            legacy_read_pending: false,
            migrating: None,
            mounted: true,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn start(&mut self) -> Vec<Effect> {
        if !self.mounted {
            return Vec::new();
        }
        self.arm_echo();
        vec![
            Effect::ReadCredentials,
            Effect::Send(OutboundMessage::SyncRequest),
        ]
    }

    pub fn unmount(&mut self) {
        debug!("coordinator unmounted in state {:?}", self.state);
        self.mounted = false;
    }

    pub fn on_message(
        &mut self,
        message: InboundMessage,
        editor: &impl EditorContent,
    ) -> Vec<Effect> {
        if !self.mounted {
            debug!("dropping message after unmount: {message:?}");
            return Vec::new();
        }
        match message {
            InboundMessage::ContentLoaded { data } => self.apply_content(data, editor),
            InboundMessage::ChangePending => {
                self.arm_echo();
                vec![Effect::Send(OutboundMessage::LoadRequest)]
            }
            InboundMessage::ContentSynced { content, conflict } => {
                let effects = if !self.state.edit_in_flight() || conflict {
                    self.apply_content(content, editor)
                } else {
                    debug!("local edit in flight, skipping synced content");
                    Vec::new()
                };
                self.clear_edit_in_flight();
                effects
            }
        }
    }

    pub fn on_editor_change(
        &mut self,
        change: EditorChange,
        editor: &impl EditorContent,
    ) -> Vec<Effect> {
        if !self.mounted {
            return Vec::new();
        }
        // Any notification consumes the marker, qualifying or not.
        if let SyncState::AwaitingOwnEcho {
            write,
            edit_in_flight,
        } = self.state
        {
            debug!("swallowed echo of {write:?} ({change:?})");
            self.state = if edit_in_flight {
                SyncState::LocalEditInFlight
            } else {
                SyncState::Idle
            };
            return Vec::new();
        }
        if !change.qualifies() {
            return Vec::new();
        }

        let Some(content) = editor.content() else {
            return Vec::new();
        };
        if self.welcome.matches(&content) {
            return Vec::new();
        }
        if self.last_synced.as_deref() == Some(content.as_str()) {
            debug!("content unchanged since last sync");
            return Vec::new();
        }

        self.state = SyncState::LocalEditInFlight;
        self.legacy_read_pending = false;
        let stats = PadStats::from_html(&content);
        self.last_synced = Some(content.clone());
        vec![
            Effect::Send(OutboundMessage::Save { content }),
            Effect::Send(OutboundMessage::MetricsChanged { context: stats }),
        ]
    }

    pub fn on_legacy_note(&mut self, note: Result<Option<String>, PanelError>) -> Vec<Effect> {
        if !self.mounted {
            debug!("dropping legacy note read after unmount");
            return Vec::new();
        }
        if !std::mem::take(&mut self.legacy_read_pending) {
            debug!("note content arrived meanwhile, dropping legacy note read");
            return Vec::new();
        }
        match note {
            Ok(Some(note)) => {
                debug!("migrating legacy note ({} bytes)", note.len());
                self.arm_echo();
                self.last_synced = Some(note.clone());
                self.migrating = Some(note.clone());
                vec![
                    Effect::SetContent(note.clone()),
                    Effect::Send(OutboundMessage::Save { content: note }),
                ]
            }
            Ok(None) => {
                self.arm_echo();
                vec![Effect::SetContent(self.welcome.as_str().to_string())]
            }
            Err(err) => {
                warn!("keeping current editor content: {err}");
                Vec::new()
            }
        }
    }

    pub fn on_credentials(&mut self, present: Result<bool, PanelError>) -> Vec<Effect> {
        if !self.mounted {
            return Vec::new();
        }
        match present {
            Ok(true) => vec![Effect::ShowAuthenticated(true)],
            Ok(false) => Vec::new(),
            Err(err) => {
                warn!("treating panel as signed out: {err}");
                Vec::new()
            }
        }
    }

    /// Completes an [`Effect::Send`]. The legacy note is only removed once
    /// its migrated copy was handed to the background.
    pub fn on_sent(
        &mut self,
        message: &OutboundMessage,
        result: Result<(), PanelError>,
    ) -> Vec<Effect> {
        let migrated = match (message, self.migrating.as_deref()) {
            (OutboundMessage::Save { content }, Some(note)) => content == note,
            _ => false,
        };
        if migrated {
            self.migrating = None;
        }
        match result {
            Ok(()) if migrated => vec![Effect::RemoveLegacyNote],
            Ok(()) => Vec::new(),
            Err(err) if migrated => {
                warn!("legacy note kept, migrating it failed: {err}");
                Vec::new()
            }
            Err(err) => {
                warn!("{err}");
                Vec::new()
            }
        }
    }

    fn apply_content(
        &mut self,
        content: Option<String>,
        editor: &impl EditorContent,
    ) -> Vec<Effect> {
        let Some(content) = content.filter(|content| !content.is_empty()) else {
            self.legacy_read_pending = true;
            return vec![Effect::ReadLegacyNote];
        };
        self.legacy_read_pending = false;
        let effects = if editor.content().as_deref() == Some(content.as_str()) {
            debug!("editor already shows incoming content");
            Vec::new()
        } else {
            self.arm_echo();
            vec![Effect::SetContent(content.clone())]
        };
        self.last_synced = Some(content);
        effects
    }

    fn arm_echo(&mut self) {
        self.next_write += 1;
        let write = WriteId(self.next_write);
        self.state = SyncState::AwaitingOwnEcho {
            write,
            edit_in_flight: self.state.edit_in_flight(),
        };
        debug!("armed echo marker for {write:?}");
    }

    fn clear_edit_in_flight(&mut self) {
        self.state = match self.state {
            SyncState::LocalEditInFlight => SyncState::Idle,
            SyncState::AwaitingOwnEcho { write, .. } => SyncState::AwaitingOwnEcho {
                write,
                edit_in_flight: false,
            },
            SyncState::Idle => SyncState::Idle,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::welcome::MessageCatalog;
    use std::collections::HashMap;

    const LEGACY_KEY: &str = "notes2";

    struct KeyCatalog;

    impl MessageCatalog for KeyCatalog {
        fn message(&self, key: &str, substitution: Option<&str>) -> String {
            format!("{key}{}", substitution.unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct FakeEditor {
        content: Option<String>,
    }

    impl EditorContent for FakeEditor {
        fn content(&self) -> Option<String> {
            self.content.clone()
        }
    }

    // Runs effects like the panel driver; every programmatic write echoes
    // back as an unfocused `insert`.
    struct Harness {
        coordinator: Coordinator,
        editor: FakeEditor,
        store: HashMap<&'static str, String>,
        sent: Vec<OutboundMessage>,
        writes: usize,
        authenticated: bool,
        storage_fails: bool,
        send_fails: bool,
        echo_writes: bool,
        defer_legacy_reads: bool,
        pending_legacy_reads: usize,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                coordinator: Coordinator::new(WelcomeDocument::build(&KeyCatalog)),
                editor: FakeEditor::default(),
                store: HashMap::new(),
                sent: Vec::new(),
                writes: 0,
                authenticated: false,
                storage_fails: false,
                send_fails: false,
                echo_writes: true,
                defer_legacy_reads: false,
                pending_legacy_reads: 0,
            }
        }

        fn started() -> Self {
            let mut harness = Self::new();
            harness.start();
            harness
        }

        fn start(&mut self) {
            let effects = self.coordinator.start();
            self.run(effects);
        }

        fn deliver(&mut self, message: InboundMessage) {
            let effects = self.coordinator.on_message(message, &self.editor);
            self.run(effects);
        }

        fn load(&mut self, data: Option<&str>) {
            self.deliver(InboundMessage::ContentLoaded {
                data: data.map(str::to_string),
            });
        }

        fn synced(&mut self, content: &str, conflict: bool) {
            self.deliver(InboundMessage::ContentSynced {
                content: Some(content.to_string()),
                conflict,
            });
        }

        fn notify(&mut self, change: EditorChange) {
            let effects = self.coordinator.on_editor_change(change, &self.editor);
            self.run(effects);
        }

        fn type_text(&mut self, html: &str) {
            self.editor.content = Some(html.to_string());
            self.notify(EditorChange::new(true, ChangeKind::Other));
        }

        fn resolve_legacy_read(&mut self) {
            assert!(self.pending_legacy_reads > 0, "no legacy read in progress");
            self.pending_legacy_reads -= 1;
            let note = Ok(self.store.get(LEGACY_KEY).cloned());
            let effects = self.coordinator.on_legacy_note(note);
            self.run(effects);
        }

        fn storage_error(&self) -> PanelError {
            PanelError::Storage {
                key: LEGACY_KEY.to_string(),
                message: "quota exceeded".to_string(),
            }
        }

        fn run(&mut self, effects: Vec<Effect>) {
            for effect in effects {
                match effect {
                    Effect::SetContent(html) => {
                        self.writes += 1;
                        self.editor.content = Some(html);
                        if self.echo_writes {
                            self.notify(EditorChange::new(false, ChangeKind::Insert));
                        }
                    }
                    Effect::Send(message) => {
                        let result = if self.send_fails {
                            Err(PanelError::Channel("port closed".to_string()))
                        } else {
                            Ok(())
                        };
                        let more = self.coordinator.on_sent(&message, result);
                        self.sent.push(message);
                        self.run(more);
                    }
                    Effect::ReadLegacyNote if self.defer_legacy_reads => {
                        self.pending_legacy_reads += 1;
                    }
                    Effect::ReadLegacyNote => {
                        let note = if self.storage_fails {
                            Err(self.storage_error())
                        } else {
                            Ok(self.store.get(LEGACY_KEY).cloned())
                        };
                        let more = self.coordinator.on_legacy_note(note);
                        self.run(more);
                    }
                    Effect::RemoveLegacyNote => {
                        self.store.remove(LEGACY_KEY);
                    }
                    Effect::ReadCredentials => {
                        let present = Ok(self.store.contains_key("credentials"));
                        let more = self.coordinator.on_credentials(present);
                        self.run(more);
                    }
                    Effect::ShowAuthenticated(flag) => self.authenticated = flag,
                }
            }
        }

        fn saves(&self) -> Vec<&str> {
            self.sent
                .iter()
                .filter_map(|message| match message {
                    OutboundMessage::Save { content } => Some(content.as_str()),
                    _ => None,
                })
                .collect()
        }

        fn shown(&self) -> &str {
            self.editor.content.as_deref().unwrap_or_default()
        }
    }

    #[test]
    fn start_requests_sync_and_checks_credentials() {
        let mut harness = Harness::new();
        harness.store.insert("credentials", "{}".to_string());
        harness.start();

        assert_eq!(harness.sent, vec![OutboundMessage::SyncRequest]);
        assert!(harness.authenticated);
        assert!(matches!(
            harness.coordinator.state,
            SyncState::AwaitingOwnEcho { .. }
        ));
    }

    #[test]
    fn signed_out_without_credentials() {
        let harness = Harness::started();
        assert!(!harness.authenticated);
    }

    #[test]
    fn falls_back_to_welcome_document() {
        let mut harness = Harness::started();
        harness.load(None);

        assert_eq!(harness.shown(), harness.coordinator.welcome.as_str());
        assert!(harness.saves().is_empty());
        assert_eq!(harness.coordinator.state, SyncState::Idle);
    }

    #[test]
    fn migrates_legacy_note() {
        let mut harness = Harness::new();
        harness.store.insert(LEGACY_KEY, "abc".to_string());
        harness.start();
        harness.load(Some(""));

        assert_eq!(harness.shown(), "abc");
        assert_eq!(harness.saves(), vec!["abc"]);
        assert!(!harness.store.contains_key(LEGACY_KEY));
    }

    #[test]
    fn legacy_note_kept_when_migration_save_fails() {
        let mut harness = Harness::new();
        harness.store.insert(LEGACY_KEY, "abc".to_string());
        harness.send_fails = true;
        harness.start();
        harness.load(None);

        assert_eq!(harness.shown(), "abc");
        assert_eq!(harness.saves(), vec!["abc"]);
        assert!(harness.store.contains_key(LEGACY_KEY));
        assert_eq!(harness.coordinator.migrating, None);
    }

    #[test]
    fn ordinary_save_does_not_remove_legacy_note() {
        let mut harness = Harness::started();
        harness.load(Some("<p>a</p>"));
        harness.store.insert(LEGACY_KEY, "abc".to_string());
        harness.type_text("<p>b</p>");

        assert_eq!(harness.saves(), vec!["<p>b</p>"]);
        assert!(harness.store.contains_key(LEGACY_KEY));
    }

    #[test]
    fn late_legacy_read_does_not_replace_synced_note() {
        let mut harness = Harness::started();
        harness.defer_legacy_reads = true;
        harness.store.insert(LEGACY_KEY, "<p>old legacy</p>".to_string());

        harness.load(None);
        harness.synced("<p>real</p>", false);
        harness.resolve_legacy_read();

        assert_eq!(harness.shown(), "<p>real</p>");
        assert!(harness.saves().is_empty());
        assert!(harness.store.contains_key(LEGACY_KEY));

        // Same with no legacy note: no welcome document over real content.
        harness.store.remove(LEGACY_KEY);
        harness.load(None);
        harness.synced("<p>real, again</p>", false);
        harness.resolve_legacy_read();
        assert_eq!(harness.shown(), "<p>real, again</p>");
    }

    #[test]
    fn local_edit_cancels_pending_legacy_read() {
        let mut harness = Harness::started();
        harness.defer_legacy_reads = true;
        harness.store.insert(LEGACY_KEY, "<p>old legacy</p>".to_string());

        harness.load(None);
        // Echo of the initial sync request.
        harness.notify(EditorChange::new(false, ChangeKind::Other));
        harness.type_text("<p>typed first</p>");
        harness.resolve_legacy_read();

        assert_eq!(harness.shown(), "<p>typed first</p>");
        assert_eq!(harness.saves(), vec!["<p>typed first</p>"]);
    }

    #[test]
    fn deferred_legacy_read_still_migrates() {
        let mut harness = Harness::started();
        harness.defer_legacy_reads = true;
        harness.store.insert(LEGACY_KEY, "abc".to_string());

        harness.load(None);
        harness.resolve_legacy_read();

        assert_eq!(harness.shown(), "abc");
        assert!(!harness.store.contains_key(LEGACY_KEY));
    }

    #[test]
    fn programmatic_write_is_not_republished() {
        let mut harness = Harness::started();
        harness.echo_writes = false;
        harness.load(Some("<p>remote</p>"));
        assert_eq!(harness.shown(), "<p>remote</p>");

        // The widget's own notification for the write, even focused.
        harness.notify(EditorChange::new(true, ChangeKind::Other));
        assert!(harness.saves().is_empty());

        // One-shot: the following real edit goes out.
        harness.type_text("<p>remote, edited</p>");
        assert_eq!(harness.saves(), vec!["<p>remote, edited</p>"]);
    }

    #[test]
    fn local_edit_publishes_save_and_metrics() {
        let mut harness = Harness::started();
        harness.load(Some("<p>a</p>"));
        harness.type_text("<p>two words</p>");

        assert_eq!(
            &harness.sent[1..],
            &[
                OutboundMessage::Save {
                    content: "<p>two words</p>".to_string()
                },
                OutboundMessage::MetricsChanged {
                    context: PadStats {
                        characters: 9,
                        words: 2
                    }
                },
            ]
        );
        assert_eq!(harness.coordinator.state, SyncState::LocalEditInFlight);
    }

    #[test]
    fn in_flight_edit_wins_unless_conflict() {
        let mut harness = Harness::started();
        harness.load(Some("<p>a</p>"));
        harness.type_text("<p>b</p>");

        harness.synced("<p>c</p>", false);
        assert_eq!(harness.shown(), "<p>b</p>");
        assert_eq!(harness.coordinator.state, SyncState::Idle);

        harness.type_text("<p>b2</p>");
        harness.synced("<p>c</p>", true);
        assert_eq!(harness.shown(), "<p>c</p>");
        assert_eq!(harness.coordinator.state, SyncState::Idle);
    }

    #[test]
    fn synced_content_applies_when_idle() {
        let mut harness = Harness::started();
        harness.load(Some("<p>a</p>"));
        harness.synced("<p>from another device</p>", false);
        assert_eq!(harness.shown(), "<p>from another device</p>");
        assert!(harness.saves().is_empty());
    }

    #[test]
    fn identical_content_applies_once() {
        let mut harness = Harness::started();
        harness.synced("<p>same</p>", false);
        harness.synced("<p>same</p>", false);
        assert_eq!(harness.writes, 1);

        harness.type_text("<p>mine</p>");
        harness.notify(EditorChange::new(true, ChangeKind::Other));
        assert_eq!(harness.saves(), vec!["<p>mine</p>"]);
    }

    #[test]
    fn unfocused_changes_are_gated() {
        let mut harness = Harness::started();
        harness.load(Some("<p>a</p>"));

        harness.editor.content = Some("<p>a, restyled</p>".to_string());
        harness.notify(EditorChange::new(false, ChangeKind::Other));
        assert_eq!(harness.sent, vec![OutboundMessage::SyncRequest]);

        harness.notify(EditorChange::new(false, ChangeKind::Rename));
        assert_eq!(harness.saves(), vec!["<p>a, restyled</p>"]);
    }

    #[test]
    fn change_pending_reloads_and_swallows_next_change() {
        let mut harness = Harness::started();
        harness.load(Some("<p>a</p>"));
        harness.deliver(InboundMessage::ChangePending);

        assert_eq!(harness.sent.last(), Some(&OutboundMessage::LoadRequest));
        harness.type_text("<p>racing edit</p>");
        assert!(harness.saves().is_empty());
    }

    #[test]
    fn echo_keeps_edit_in_flight() {
        let mut harness = Harness::started();
        harness.load(Some("<p>a</p>"));
        harness.type_text("<p>b</p>");
        harness.deliver(InboundMessage::ChangePending);
        assert!(harness.coordinator.state.edit_in_flight());

        harness.notify(EditorChange::new(false, ChangeKind::Insert));
        assert_eq!(harness.coordinator.state, SyncState::LocalEditInFlight);
    }

    #[test]
    fn welcome_document_is_never_saved() {
        let mut harness = Harness::started();
        harness.load(None);
        let welcome = harness.coordinator.welcome.as_str().to_string();
        harness.type_text(&welcome);
        assert!(harness.saves().is_empty());
    }

    #[test]
    fn storage_failure_keeps_editor_content() {
        let mut harness = Harness::started();
        harness.editor.content = Some("<p>draft</p>".to_string());
        harness.storage_fails = true;
        harness.load(None);

        assert_eq!(harness.shown(), "<p>draft</p>");
        assert!(harness.saves().is_empty());
    }

    #[test]
    fn late_results_after_unmount_are_dropped() {
        let mut harness = Harness::started();
        harness.coordinator.unmount();

        assert!(harness
            .coordinator
            .on_legacy_note(Ok(Some("abc".to_string())))
            .is_empty());
        assert!(harness.coordinator.on_credentials(Ok(true)).is_empty());
        assert!(harness
            .coordinator
            .on_message(InboundMessage::ChangePending, &harness.editor)
            .is_empty());
        assert!(harness.coordinator.start().is_empty());
    }

    #[test]
    fn change_kind_from_widget_names() {
        assert_eq!(ChangeKind::from_name("rename"), ChangeKind::Rename);
        assert_eq!(ChangeKind::from_name("insert"), ChangeKind::Insert);
        assert_eq!(ChangeKind::from_name("attributes"), ChangeKind::Other);
    }
}
