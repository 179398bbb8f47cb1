//! Human readable lists of expected terminals.

/// Join expected terminal names into a phrase, keeping at most `limit` of them.
pub(crate) fn describe_expected(expected: &[String], limit: usize) -> String {
    let shown = &expected[..expected.len().min(limit)];
    let hidden = expected.len() - shown.len();
    let mut result = match shown.len() {
        0 => return "nothing".to_string(),
        1 => shown[0].clone(),
        2 => format!("{} or {}", shown[0], shown[1]),
        _ => {
            let mut result = shown[..shown.len() - 1]
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            result.push_str(", or ");
            result.push_str(&shown[shown.len() - 1]);
            result
        }
    };
    if hidden > 0 {
        result.push_str(&format!(" (and {hidden} more)"));
    }
    result
}
