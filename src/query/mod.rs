pub mod builder;
pub mod filter;

use serde::{Deserialize, Serialize};

use crate::query::filter::AccountFilter;
use crate::types::{AccountEncoding, CommitmentLevel, DataSlice, RpcProgramAccountsConfig};

/// Accumulated `getProgramAccounts` options.
///
/// Every field is optional: `None` means "not configured here", which is what
/// lets [`QueryConfig::merge`] layer one config over another without wiping
/// settings the overriding side never touched. Effective values (with defaults
/// applied) come from the accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<AccountEncoding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment: Option<CommitmentLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<AccountFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_slice: Option<DataSlice>,
}

impl QueryConfig {
    pub fn encoding(&self) -> AccountEncoding {
        self.encoding.unwrap_or_default()
    }

    pub fn commitment(&self) -> CommitmentLevel {
        self.commitment.unwrap_or_default()
    }

    pub fn filters(&self) -> &[AccountFilter] {
        self.filters.as_deref().unwrap_or_default()
    }

    /// Field-wise merge where `other` wins whenever it sets a field.
    pub fn merge(&self, other: &QueryConfig) -> QueryConfig {
        self.with_replaced_fields(other.encoding, other.commitment, other.filters.clone())
            .with_data_slice(other.data_slice.or(self.data_slice))
    }

    /// Copy of `self` with only the given fields replaced.
    pub fn with_replaced_fields(
        &self,
        encoding: Option<AccountEncoding>,
        commitment: Option<CommitmentLevel>,
        filters: Option<Vec<AccountFilter>>,
    ) -> QueryConfig {
        QueryConfig {
            encoding: encoding.or(self.encoding),
            commitment: commitment.or(self.commitment),
            filters: filters.or_else(|| self.filters.clone()),
            data_slice: self.data_slice,
        }
    }

    pub fn with_data_slice(&self, data_slice: Option<DataSlice>) -> QueryConfig {
        QueryConfig {
            data_slice,
            ..self.clone()
        }
    }

    /// Copy of `self` with `filter` appended after the existing filters.
    pub fn with_filter(&self, filter: AccountFilter) -> QueryConfig {
        let mut filters = self.filters().to_vec();
        filters.push(filter);
        self.with_replaced_fields(None, None, Some(filters))
    }

    pub fn to_rpc_config(&self) -> RpcProgramAccountsConfig {
        RpcProgramAccountsConfig {
            encoding: self.encoding(),
            commitment: self.commitment(),
            filters: self
                .filters
                .as_ref()
                .map(|filters| filters.iter().map(AccountFilter::to_rpc).collect()),
            data_slice: self.data_slice,
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    fn with_filters(filters: Vec<AccountFilter>) -> QueryConfig {
        QueryConfig {
            filters: Some(filters),
            ..QueryConfig::default()
        }
    }

    #[test]
    fn defaults_are_base64_processed() {
        let config = QueryConfig::default();
        assert_eq!(config.encoding(), AccountEncoding::Base64);
        assert_eq!(config.commitment(), CommitmentLevel::Processed);
        assert!(config.filters().is_empty());
        assert_eq!(config.to_rpc_config().filters, None);
    }

    #[test]
    fn merge_keeps_base_filters_when_override_has_none() {
        let base = with_filters(vec![
            AccountFilter::data_size(165),
            AccountFilter::memcmp(0, 4_u8),
        ]);
        let other = QueryConfig {
            commitment: Some(CommitmentLevel::Finalized),
            ..QueryConfig::default()
        };

        let merged = base.merge(&other);
        assert_eq!(merged.filters, base.filters);
        assert_eq!(merged.commitment(), CommitmentLevel::Finalized);
    }

    #[test]
    fn merge_override_wins_when_set() {
        let base = QueryConfig {
            encoding: Some(AccountEncoding::Base58),
            commitment: Some(CommitmentLevel::Confirmed),
            filters: Some(vec![AccountFilter::data_size(1)]),
            data_slice: Some(DataSlice {
                offset: 0,
                length: 32,
            }),
        };
        let other = QueryConfig {
            encoding: Some(AccountEncoding::Base64),
            filters: Some(vec![AccountFilter::data_size(2)]),
            ..QueryConfig::default()
        };

        let merged = base.merge(&other);
        assert_eq!(merged.encoding(), AccountEncoding::Base64);
        assert_eq!(merged.commitment(), CommitmentLevel::Confirmed);
        assert_eq!(merged.filters(), &[AccountFilter::data_size(2)]);
        assert_eq!(merged.data_slice, base.data_slice);
    }

    #[test]
    fn merge_into_empty_reproduces_source() {
        let source = QueryConfig {
            encoding: Some(AccountEncoding::Base58),
            commitment: Some(CommitmentLevel::Finalized),
            filters: Some(vec![AccountFilter::memcmp(33, "mint")]),
            data_slice: Some(DataSlice {
                offset: 1,
                length: 2,
            }),
        };
        assert_eq!(QueryConfig::default().merge(&source), source);
    }

    #[test]
    fn with_filter_copies_instead_of_aliasing() {
        let shared = with_filters(vec![AccountFilter::data_size(82)]);
        let left = shared.with_filter(AccountFilter::memcmp(0, 1_u8));
        let right = shared.with_filter(AccountFilter::memcmp(0, 2_u8));

        assert_eq!(shared.filters().len(), 1);
        assert_eq!(left.filters().len(), 2);
        assert_eq!(right.filters().len(), 2);
        assert_eq!(left.filters()[1], AccountFilter::memcmp(0, 1_u8));
        assert_eq!(right.filters()[1], AccountFilter::memcmp(0, 2_u8));
    }

    #[test]
    fn replaced_fields_carry_the_rest_over() {
        let config = QueryConfig {
            encoding: Some(AccountEncoding::Base58),
            commitment: Some(CommitmentLevel::Confirmed),
            filters: Some(vec![AccountFilter::data_size(3)]),
            data_slice: Some(DataSlice {
                offset: 4,
                length: 5,
            }),
        };
        let replaced = config.with_replaced_fields(None, Some(CommitmentLevel::Finalized), None);
        assert_eq!(replaced.encoding, config.encoding);
        assert_eq!(replaced.commitment, Some(CommitmentLevel::Finalized));
        assert_eq!(replaced.filters, config.filters);
        assert_eq!(replaced.data_slice, config.data_slice);
    }

    #[test]
    fn config_json_roundtrip_keeps_filter_order() {
        let config = with_filters(vec![
            AccountFilter::memcmp(0, 4_u8),
            AccountFilter::data_size(679),
            AccountFilter::memcmp(326, [1_u8; 32]),
        ]);
        let json = serde_json::to_string(&config).unwrap();
        let back: QueryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
