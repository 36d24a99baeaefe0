//! Markdown report renderer.

use crate::failure::Failure;

/// Render failures as a markdown report: one section per failure, plus a
/// table of sub-failures when present.
pub fn render_markdown(failures: &[Failure]) -> String {
    let mut out = String::new();

    out.push_str("## Assertion Report\n\n");
    out.push_str(&format!("**Failures**: {}\n\n", failures.len()));

    if failures.is_empty() {
        out.push_str("_No assertion failures._\n");
        return out;
    }

    for (i, failure) in failures.iter().enumerate() {
        let title = match (&failure.custom_kind, &failure.assertion_name) {
            (Some(kind), Some(name)) => format!("{} `{}` ({})", i + 1, name, kind),
            (None, Some(name)) => format!("{} `{}`", i + 1, name),
            (Some(kind), None) => format!("{} ({})", i + 1, kind),
            (None, None) => (i + 1).to_string(),
        };
        out.push_str(&format!("### {}\n\n", title));
        out.push_str(&format!("{}\n\n", failure.message));
        out.push_str(&format!(
            "- **Expected**: `{}`\n- **Actual**: `{}`\n",
            failure.expected, failure.actual
        ));
        if let Some(location) = &failure.location {
            out.push_str(&format!("- **Location**: `{}`\n", location));
            if let Some(text) = &location.text {
                out.push_str(&format!("- **Source**: `{}`\n", text));
            }
        }
        out.push_str(&format!(
            "- **Time**: {}\n",
            failure.timestamp.to_rfc3339()
        ));
        out.push('\n');

        if !failure.sub_failures.is_empty() {
            out.push_str("| # | Difference | Expected | Actual |\n|---|---|---|---|\n");
            for (j, sub) in failure.sub_failures.iter().enumerate() {
                out.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    j + 1,
                    cell(&sub.message),
                    cell(&sub.expected),
                    cell(&sub.actual)
                ));
            }
            out.push('\n');
        }
    }

    out
}

/// Escape a value for a table cell.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let md = render_markdown(&[]);
        assert!(md.starts_with("## Assertion Report"));
        assert!(md.contains("_No assertion failures._"));
    }

    #[test]
    fn test_sections_and_table() {
        let nested = Failure::new("mismatch at a|b", "1", "2");
        let failures = vec![
            Failure::new("first", "x", "y")
                .with_assertion_name("total")
                .with_sub_failures(vec![nested]),
            Failure::new("second", "p", "q"),
        ];
        let md = render_markdown(&failures);
        assert!(md.contains("**Failures**: 2"));
        assert!(md.contains("### 1 `total`"));
        assert!(md.contains("### 2\n"));
        assert!(md.contains("| 1 | mismatch at a\\|b | 2 | 1 |"));
        assert_eq!(md.matches("| # | Difference").count(), 1);
    }
}
