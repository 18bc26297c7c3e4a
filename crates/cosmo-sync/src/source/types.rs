//! Registry wire types
//!
//! Request body and response envelope of the `GetCosmetics` endpoint.

use crate::model::{FilterMode, Page, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON body of a registry query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmeticsQuery {
    pub is_descending: bool,
    pub max_result: u32,
    pub page_number: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_notification_item_id: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_type_notification_id: Option<u32>,
}

impl CosmeticsQuery {
    /// Query for one page in the given mode
    pub fn page(mode: FilterMode, max_result: u32, page_number: u32) -> Self {
        let (item_id, type_id) = match mode.constraints() {
            Some((item, kind)) => (Some(item), Some(kind)),
            None => (None, None),
        };

        Self {
            is_descending: false,
            max_result,
            page_number,
            notification_code: None,
            business_notification_item_id: item_id,
            business_type_notification_id: type_id,
        }
    }

    /// Same query with the server's ordering reversed
    pub fn descending(mut self) -> Self {
        self.is_descending = true;
        self
    }

    /// Point lookup of a single notification code
    pub fn by_key(mode: FilterMode, notification_code: &str) -> Self {
        Self {
            notification_code: Some(notification_code.to_string()),
            ..Self::page(mode, 10, 1)
        }
    }
}

/// Response envelope
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmeticsResponse {
    #[serde(default)]
    pub return_object: Option<ReturnObject>,
}

/// Payload inside the envelope
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnObject {
    /// Kept as raw values so one malformed entry does not sink the page
    #[serde(default)]
    pub cosmetics_list: Option<Vec<Value>>,

    #[serde(default)]
    pub total_rows: Option<u64>,

    #[serde(default)]
    pub max_results: Option<u64>,
}

impl CosmeticsResponse {
    /// Convert into a [`Page`]
    ///
    /// A response without `returnObject.cosmeticsList` is an empty page with a
    /// zero total. Non-object list entries are dropped.
    pub fn into_page(self, requested_page_size: u32) -> Page {
        let Some(ReturnObject {
            cosmetics_list: Some(list),
            total_rows,
            max_results,
        }) = self.return_object
        else {
            return Page::empty(requested_page_size);
        };

        Page {
            records: list.into_iter().filter_map(Record::from_value).collect(),
            reported_total: total_rows.unwrap_or(0),
            reported_page_size: max_results.unwrap_or(u64::from(requested_page_size)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unfiltered_query_omits_optional_fields() {
        let body = serde_json::to_value(CosmeticsQuery::page(FilterMode::Unfiltered, 100, 3)).unwrap();
        assert_eq!(body, json!({"isDescending": false, "maxResult": 100, "pageNumber": 3}));
    }

    #[test]
    fn test_filtered_query_carries_constraints() {
        let body = serde_json::to_value(CosmeticsQuery::page(FilterMode::Filtered, 10, 0)).unwrap();
        assert_eq!(
            body,
            json!({
                "isDescending": false,
                "maxResult": 10,
                "pageNumber": 0,
                "businessNotificationItemId": 34,
                "businessTypeNotificationId": 5
            })
        );
    }

    #[test]
    fn test_key_query_sets_code() {
        let query = CosmeticsQuery::by_key(FilterMode::Unfiltered, "N-77");
        assert_eq!(query.notification_code.as_deref(), Some("N-77"));
        assert_eq!(query.page_number, 1);
    }

    #[test]
    fn test_into_page_reads_envelope() {
        let response: CosmeticsResponse = serde_json::from_value(json!({
            "returnObject": {
                "cosmeticsList": [{"notificationCode": "A"}, 7, {"notificationCode": "B"}],
                "totalRows": 250,
                "maxResults": 100
            }
        }))
        .unwrap();

        let page = response.into_page(100);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.reported_total, 250);
        assert_eq!(page.reported_page_size, 100);
    }

    #[test]
    fn test_into_page_without_list_is_empty() {
        let response: CosmeticsResponse =
            serde_json::from_value(json!({"returnObject": {"totalRows": 9}})).unwrap();
        let page = response.into_page(100);
        assert!(page.is_empty());
        assert_eq!(page.reported_total, 0);

        let response: CosmeticsResponse = serde_json::from_value(json!({"status": 1})).unwrap();
        assert!(response.into_page(50).is_empty());
    }
}
