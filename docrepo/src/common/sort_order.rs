/// Specifies the direction for sorting documents.
///
/// Used by [crate::query::FindOptions::sort_by], by the typed sort selector of
/// the repository and by the `$sort` aggregation stage.
///
/// ```text
/// let options = order_by("price", SortOrder::Descending);
/// let orders = repo.get_list(None, options).await?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Sort in ascending order (smallest to largest, A-Z, oldest to newest)
    #[default]
    Ascending,
    /// Sort in descending order (largest to smallest, Z-A, newest to oldest)
    Descending,
}

impl SortOrder {
    /// Store-native direction marker, `1` or `-1`.
    pub fn direction(&self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }

    pub(crate) fn apply(&self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}
