//! HTML coverage reports
//!
//! Self-contained pages with embedded CSS: one detail page per image and one
//! aggregate table across all images.

use super::{CoverageMap, ImageCoverage};

/// Escape HTML special characters to prevent XSS
pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn base_styles() -> &'static str {
    r#"
        body { font-family: Arial, sans-serif; margin: 2em; background: #f9f9f9; color: #333; }
        .container { max-width: 900px; margin: auto; background: #fff; padding: 2em; border-radius: 8px; box-shadow: 0 4px 8px rgba(0,0,0,0.1); }
        .footer { margin-top: 20px; font-size: 0.8em; color: #888; text-align: center; }
    "#
}

fn detail_styles() -> &'static str {
    r#"
        .summary { background: #f4f4f4; padding: 1.5em; border-radius: 8px; margin-bottom: 2em; border: 1px solid #ddd; }
        .summary .percentage { font-size: 1.8em; font-weight: bold; color: #0056b3; }
        .progress-bar { background: #e9ecef; border-radius: 50px; overflow: hidden; height: 30px; margin-top: 1em; }
        .progress-bar-inner { background: #28a745; height: 100%; color: white; text-align: center; line-height: 30px; font-weight: bold; }
        .function-list { display: grid; grid-template-columns: repeat(auto-fill, minmax(320px, 1fr)); gap: 1em; list-style-type: none; padding: 0; }
        .function-list li { padding: 0.6em; border-radius: 5px; font-family: monospace; white-space: nowrap; overflow: hidden; text-overflow: ellipsis; }
        .called { background: #d4edda; color: #155724; border-left: 5px solid #28a745; }
        .uncalled { background: #f8d7da; color: #721c24; border-left: 5px solid #dc3545; }
    "#
}

fn aggregate_styles() -> &'static str {
    r#"
        table { width: 100%; border-collapse: collapse; margin-top: 2em; }
        th, td { padding: 0.7em 1em; border-bottom: 1px solid #ddd; text-align: left; }
        th { background: #f4f4f4; }
        tr:hover { background: #f1f7ff; }
        .bar { height: 18px; background: #e9ecef; border-radius: 9px; overflow: hidden; }
        .bar-inner { background: #28a745; height: 100%; color: white; text-align: center; font-size: 0.9em; font-weight: bold; }
    "#
}

fn open_document(html: &mut String, title: &str, extra_styles: &str) {
    html.push_str("<!DOCTYPE html>\n");
    html.push_str("<html lang=\"en\">\n");
    html.push_str("<head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str(&format!("    <title>{}</title>\n", escape_html(title)));
    html.push_str("    <style>");
    html.push_str(base_styles());
    html.push_str(extra_styles);
    html.push_str("</style>\n");
    html.push_str("</head>\n");
    html.push_str("<body>\n");
    html.push_str("<div class=\"container\">\n");
}

fn close_document(html: &mut String) {
    html.push_str("    <div class=\"footer\">Generated by callsift</div>\n");
    html.push_str("</div>\n");
    html.push_str("</body>\n");
    html.push_str("</html>\n");
}

/// Detail page for one image: summary, progress bar, every routine colored
/// by whether it was called
pub fn render_image_html(image: &str, data: &ImageCoverage) -> String {
    let image_html = escape_html(image);
    let pct = data.percentage();
    let mut html = String::new();

    open_document(&mut html, &format!("Coverage Report for {}", image), detail_styles());

    html.push_str("    <h1>Coverage Report</h1>\n");
    html.push_str(&format!("    <h2>Image: {}</h2>\n", image_html));

    html.push_str("    <div class=\"summary\">\n");
    html.push_str(&format!(
        "        <p><strong>Total Functions:</strong> {}</p>\n",
        data.total()
    ));
    html.push_str(&format!(
        "        <p><strong>Called Functions:</strong> {}</p>\n",
        data.called_count()
    ));
    html.push_str(&format!(
        "        <p><strong>Uncalled Functions:</strong> {}</p>\n",
        data.uncalled_count()
    ));
    html.push_str(&format!(
        "        <p class=\"percentage\">Coverage: {:.2}%</p>\n",
        pct
    ));
    html.push_str("        <div class=\"progress-bar\">\n");
    html.push_str(&format!(
        "            <div class=\"progress-bar-inner\" style=\"width: {:.2}%\">{:.2}%</div>\n",
        pct, pct
    ));
    html.push_str("        </div>\n");
    html.push_str("    </div>\n");

    html.push_str("    <details>\n");
    html.push_str("    <summary><h2>Function Details</h2></summary>\n");
    html.push_str("    <p><strong>Legend: </strong><span class=\"called\"> Called Function </span><span class=\"uncalled\"> Uncalled Function </span></p>\n");
    html.push_str("    <ul class=\"function-list\">\n");
    for function in &data.defined {
        let status = if data.called.contains(function) {
            "called"
        } else {
            "uncalled"
        };
        let name = escape_html(function);
        html.push_str(&format!(
            "        <li class=\"{}\" title=\"{}\">{}</li>\n",
            status, name, name
        ));
    }
    html.push_str("    </ul>\n");
    html.push_str("    </details>\n");

    close_document(&mut html);
    html
}

/// One table row per image with its coverage bar
pub fn render_aggregate_html(coverage: &CoverageMap) -> String {
    let mut html = String::new();

    open_document(&mut html, "Aggregate Coverage Report", aggregate_styles());

    html.push_str("    <h1>Aggregate Coverage Report</h1>\n");
    html.push_str("    <table>\n");
    html.push_str("        <tr><th>Image</th><th>Total Functions</th><th>Called Functions</th><th>Coverage</th></tr>\n");

    for (image, data) in coverage {
        let pct = data.percentage();
        html.push_str(&format!(
            "        <tr><td>{}</td><td>{}</td><td>{}</td><td><div class=\"bar\"><div class=\"bar-inner\" style=\"width: {:.2}%\">{:.2}%</div></div></td></tr>\n",
            escape_html(image),
            data.total(),
            data.called_count(),
            pct,
            pct
        ));
    }

    html.push_str("    </table>\n");
    close_document(&mut html);
    html
}
