use std::sync::Arc;

/// A compressed frame ready for the wire.
///
/// The payload is reference-counted so one encode can be fanned out to
/// every stream subscriber without copying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedFrame {
    bytes: Arc<[u8]>,
    content_type: &'static str,
    index: usize,
}

impl EncodedFrame {
    pub fn new(bytes: Vec<u8>, content_type: &'static str, index: usize) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
            index,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Index of the source frame this was encoded from.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_payload() {
        let frame = EncodedFrame::new(vec![1, 2, 3], "image/jpeg", 9);
        let copy = frame.clone();
        assert!(std::ptr::eq(frame.bytes().as_ptr(), copy.bytes().as_ptr()));
        assert_eq!(copy.content_type(), "image/jpeg");
        assert_eq!(copy.index(), 9);
        assert_eq!(copy.len(), 3);
    }
}
