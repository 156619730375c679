use crate::models::MatchRow;

/// Keep every row tied at the highest score, best first.
///
/// Ties are never broken; the sort is stable so tied rows keep their
/// retrieval order.
pub fn select_best(mut rows: Vec<MatchRow>) -> Vec<MatchRow> {
    rows.sort_by(|a, b| b.score.total_cmp(&a.score));
    let Some(best) = rows.first().map(|row| row.score) else {
        return rows;
    };
    rows.into_iter().take_while(|row| row.score == best).collect()
}
