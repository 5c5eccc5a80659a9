use crate::Text;

/// Receives the numbered expansion values a wildcard match produces.
///
/// On a partial match the dispatcher pushes the wild part first and the
/// fixed part second; the fixed part arrives detainted because the lookup
/// validated it against the table. Call sites bind the pushed values to
/// their numbered expansion variables in order.
pub trait ExpansionSink {
    fn push(&mut self, value: Text);
}

/// Sink that keeps the pushed values, in order.
#[derive(Debug, Default)]
pub struct CapturedExpansion {
    pub values: Vec<Text>,
}

impl ExpansionSink for CapturedExpansion {
    fn push(&mut self, value: Text) {
        self.values.push(value);
    }
}

/// Sink for call sites with no use for expansion variables.
#[derive(Debug, Default)]
pub struct DiscardExpansion;

impl ExpansionSink for DiscardExpansion {
    fn push(&mut self, _value: Text) {}
}
