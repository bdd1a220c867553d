pub trait MessageCatalog {
    fn message(&self, key: &str, substitution: Option<&str>) -> String;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WelcomeDocument {
    html: String,
}

impl WelcomeDocument {
    pub fn build(catalog: &impl MessageCatalog) -> Self {
        let t = |key: &str| catalog.message(key, None);
        let strong = |key: &str| format!("<strong>{}</strong>", t(key));

        let title = t("welcomeTitle3");
        let subtitle = t("welcomeSubtitle");
        let open_notes = t("welcomeOpenNotes");
        let windows_linux =
            catalog.message("welcomeWindowsLinuxShortcut", Some("<code>Alt+Shift+W</code>"));
        let mac = catalog.message("welcomeMacShortcut", Some("<code>Opt+Shift+W</code>"));
        let access_notes = t("welcomeAccessNotes");
        let sync_info = catalog.message("welcomeSyncInfo", Some(strong("syncNotes").as_str()));
        let format_text = t("welcomeFormatText");
        let heading = code_spans(&t("welcomeHeading"));
        let bold = code_spans(&t("welcomeBold"));
        let italics = code_spans(&t("welcomeItalics"));
        let bulleted = code_spans(&t("welcomeBulleted"));
        let numbered = code_spans(&t("welcomeNumbered"));
        let code = double_tick_code_spans(&t("welcomeCode"));
        let suggestion = t("welcomeSuggestion");
        let feedback = catalog.message("welcomeGiveFeedback", Some(strong("feedback").as_str()));
        let thats_it = t("welcomeThatsIt");

        let html = format!(
            "
  <h2>{title}</h2>
  <p>{subtitle}</p>
  <p><strong>{open_notes}</strong></p>
  <ul>
    <li>{windows_linux}</li>
    <li>{mac}</li>
  </ul>
  <p><strong>{access_notes}</strong></p>
  <ul>
    <li>
      {sync_info}
    </li>
  </ul>
  <p>{format_text}</p>
  <ul>
    <li>{heading}</li>
    <li>{bold}</li>
    <li>{italics}</li>
    <li>{bulleted}</li>
    <li>{numbered}</li>
    <li>{code}</li>
  </ul>
  <p><strong>{suggestion}</strong></p>
  <ul>
    <li>{feedback}</li>
  </ul>
  <p>{thats_it}</p>
"
        );

        Self { html }
    }

    pub fn as_str(&self) -> &str {
        &self.html
    }

    /// True when `content` is this document as the editor hands it back.
    ///
    /// Only the first `&nbsp;` is normalized, and surrounding whitespace is
    /// ignored.
    pub fn matches(&self, content: &str) -> bool {
        content.replacen("&nbsp;", " ", 1).trim() == self.html.trim()
    }
}

fn code_spans(hint: &str) -> String {
    hint.replace(" `", " <code>").replace('`', "</code>")
}

/// Like [`code_spans`] for hints delimited by double backticks, keeping one
/// literal backtick inside the code span.
fn double_tick_code_spans(hint: &str) -> String {
    hint.replace(" ``", " <code>`").replace("``", "`</code>")
}
