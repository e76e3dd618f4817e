//! Fan-out wrapper around `block_protocol_legacy::word_select` (`spec.md`
//! §4.5): translates one word-select packet for every lobby recipient and
//! collapses any per-recipient suppressions into a single notice back to
//! the sender ("every such suppression tells the sender one time per
//! call that some recipients did not receive the message").

use block_data::word_select::WordSelectTables;
use block_protocol_legacy::word_select::{translate_word_select, TranslatedWordSelect, WordSelectError};
use block_types::ClientVariant;

/// One recipient's delivered (translated) word-select payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery<R> {
    pub recipient: R,
    pub payload: TranslatedWordSelect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSelectBroadcast<R> {
    pub deliveries: Vec<Delivery<R>>,
    /// True if at least one recipient was suppressed; the caller should
    /// send `block_data::messages::MessageTable`'s
    /// `"word_select.partial_delivery"` key back to the sender exactly
    /// once when this is set.
    pub any_suppressed: bool,
}

/// Translate a word-select packet for each `(recipient, recipient_variant)`
/// pair. Recipients whose translation is fully or partially untranslatable
/// are dropped from `deliveries` and folded into `any_suppressed`.
pub fn broadcast_word_select<R: Copy>(
    tables: &WordSelectTables,
    sender: ClientVariant,
    ws_type: u16,
    words: [u16; 8],
    recipients: &[(R, ClientVariant)],
) -> Result<WordSelectBroadcast<R>, WordSelectError> {
    let mut deliveries = Vec::with_capacity(recipients.len());
    let mut any_suppressed = false;

    for &(recipient, variant) in recipients {
        match translate_word_select(tables, sender, variant, ws_type, words)? {
            Some(payload) => deliveries.push(Delivery { recipient, payload }),
            None => any_suppressed = true,
        }
    }

    Ok(WordSelectBroadcast {
        deliveries,
        any_suppressed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use block_data::word_select::WordSelectTables;

    #[test]
    fn same_family_recipients_are_never_suppressed() {
        let tables = WordSelectTables::new();
        let recipients = [(1u32, ClientVariant::V1Legacy), (2u32, ClientVariant::V1Legacy)];
        let result = broadcast_word_select(
            &tables,
            ClientVariant::V1Legacy,
            0,
            [1, 2, 3, 4, 5, 6, 7, 8],
            &recipients,
        )
        .unwrap();
        assert_eq!(result.deliveries.len(), 2);
        assert!(!result.any_suppressed);
    }

    #[test]
    fn cross_family_list_all_is_suppressed_and_flagged_once() {
        use block_data::word_select::LIST_ALL_INDEX;
        let tables = WordSelectTables::new();
        let recipients = [(1u32, ClientVariant::V2Pc), (2u32, ClientVariant::V2Pc)];
        let result = broadcast_word_select(
            &tables,
            ClientVariant::V1Legacy,
            LIST_ALL_INDEX,
            [0; 8],
            &recipients,
        )
        .unwrap();
        assert!(result.deliveries.is_empty());
        assert!(result.any_suppressed);
    }
}
