//! xUnit XML coverage report
//!
//! One `<testsuite>` per image: every discovered routine counts as a test,
//! uncalled routines as skipped. A single `Result` test case carries the
//! summary and the called/uncalled lists so CI dashboards show them inline.

use super::{safe_name, ImageCoverage};

/// Escape XML special characters in attribute values and text
fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn render_xunit(image: &str, data: &ImageCoverage) -> String {
    let safe = safe_name(image);
    let suite = format!("binary_coverage_{}", safe);
    let skipped = data.uncalled_count();

    let summary = format!(
        "Coverage Summary for {} | Total Functions: {} | Called Functions: {} | Uncalled Functions: {} | Coverage: {:.2}%",
        safe,
        data.total(),
        data.called_count(),
        skipped,
        data.percentage()
    );

    let mut details = String::new();
    if !data.called.is_empty() {
        details.push_str("CALLED FUNCTIONS:\n");
        for function in &data.called {
            details.push_str(&format!("  ✓ {}\n", function));
        }
        details.push('\n');
    }
    if skipped > 0 {
        details.push_str("UNCALLED FUNCTIONS:\n");
        for function in data.uncalled() {
            details.push_str(&format!("  ✗ {}\n", function));
        }
    }

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<testsuites>\n");
    xml.push_str(&format!(
        "  <testsuite errors=\"0\" failures=\"0\" name=\"{}\" skipped=\"{}\" tests=\"{}\">\n",
        escape_xml(&suite),
        skipped,
        data.total()
    ));
    xml.push_str(&format!(
        "    <testcase classname=\"{}\" name=\"Result\">\n",
        escape_xml(&suite)
    ));
    xml.push_str(&format!(
        "      <passed message=\"{}\">{}</passed>\n",
        escape_xml(&summary),
        escape_xml(&details)
    ));
    xml.push_str("    </testcase>\n");
    xml.push_str("  </testsuite>\n");
    xml.push_str("</testsuites>\n");
    xml
}
