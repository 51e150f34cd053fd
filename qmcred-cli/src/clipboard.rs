use plugin_client::ClipboardSink;

type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// The desktop clipboard, opened on first use.
#[derive(Default)]
pub struct SystemClipboard {
    #[cfg(feature = "clipboard")]
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "clipboard")]
impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), SinkError> {
        let clipboard = match &mut self.inner {
            Some(clipboard) => clipboard,
            slot => slot.insert(arboard::Clipboard::new()?),
        };
        clipboard.set_text(text.to_owned())?;
        Ok(())
    }
}

#[cfg(not(feature = "clipboard"))]
impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, _text: &str) -> Result<(), SinkError> {
        Err("clipboard support is not enabled in this build".into())
    }
}
