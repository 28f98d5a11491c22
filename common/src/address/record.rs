/// An address object to be created, as read from an input source.
///
/// The `subnet` is kept verbatim; it is only parsed when the record is turned
/// into an [`AddressObject`](super::object::AddressObject). The same goes for
/// `color`: an out-of-range value is carried here and replaced later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    pub name: String,
    pub subnet: String,
    pub comment: String,
    pub color: Option<i64>,
}

impl AddressRecord {
    pub fn new(
        name: impl Into<String>,
        subnet: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            subnet: subnet.into(),
            comment: comment.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: i64) -> Self {
        self.color = Some(color);
        self
    }
}

/// Generated object name for the 1-based `ordinal`, e.g. `host_0007`.
pub fn host_name(ordinal: usize) -> String {
    format!("host_{ordinal:04}")
}
