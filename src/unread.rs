/// Read/unread tracking: the "first unread" anchor for a freshly opened
/// conversation
///
/// The count is captured once per conversation-open, before the mark-read call
/// zeroes it server-side. New arrivals during the viewing do not move the
/// anchor; the view scrolls to the newest message instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreadAnchor {
    captured: u32,
}

impl UnreadAnchor {
    pub fn capture(unread_count: u32) -> Self {
        Self {
            captured: unread_count,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn captured(&self) -> u32 {
        self.captured
    }

    /// Index of the first unread message in a list of `total` loaded messages.
    /// No anchor when nothing was unread or the count exceeds what was loaded.
    pub fn anchor_index(&self, total: usize) -> Option<usize> {
        let captured = self.captured as usize;
        if captured == 0 || captured > total {
            return None;
        }
        Some(total - captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_unread_of_ten_anchors_at_seven() {
        assert_eq!(UnreadAnchor::capture(3).anchor_index(10), Some(7));
    }

    #[test]
    fn zero_unread_produces_no_anchor() {
        assert_eq!(UnreadAnchor::capture(0).anchor_index(10), None);
        assert_eq!(UnreadAnchor::none().anchor_index(10), None);
    }

    #[test]
    fn count_exceeding_loaded_messages_produces_no_anchor() {
        assert_eq!(UnreadAnchor::capture(12).anchor_index(10), None);
        assert_eq!(UnreadAnchor::capture(10).anchor_index(10), Some(0));
    }
}
