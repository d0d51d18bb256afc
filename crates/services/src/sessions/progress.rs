/// Aggregated view of session progress, useful to hosts rendering a bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    /// Answered share in `[0, 100]`.
    pub percent: f64,
    pub is_complete: bool,
}
