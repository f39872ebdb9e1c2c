//! Console coverage report

use super::CoverageMap;

/// Render the per-image console summary
pub fn render_text(coverage: &CoverageMap) -> String {
    let mut out = String::new();

    for (image, data) in coverage {
        let rule = "=".repeat(50);
        out.push_str(&format!("\n{}\n", rule));
        out.push_str(&format!("Image: {}\n", image));
        out.push_str(&format!("{}\n", rule));
        out.push_str(&format!("  Functions Found:   {}\n", data.total()));
        out.push_str(&format!("  Functions Called:  {}\n", data.called_count()));
        out.push_str(&format!("  Coverage:          {:.2}%\n", data.percentage()));
        out.push_str(&format!("{}\n", "-".repeat(50)));

        if data.called.is_empty() {
            out.push_str("  No functions were called for this image.\n");
        } else {
            out.push_str("  Called Functions:\n");
            for function in &data.called {
                out.push_str(&format!("    - {}\n", function));
            }
        }

        if data.uncalled_count() > 0 {
            out.push_str("\n  Uncalled Functions:\n");
            for function in data.uncalled() {
                out.push_str(&format!("    - {}\n", function));
            }
        }
    }

    out.push_str("\n--- End of Console Report ---\n");
    out
}
