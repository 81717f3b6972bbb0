//! Static HTML page listing where the published documents can be fetched.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::info;

use gauntlet_shared::{GauntletError, PublishSettings, Result};

use crate::PublishReport;

const STYLE: &str = "body { font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; }
.section { margin: 20px 0; padding: 15px; border: 1px solid #ddd; border-radius: 5px; }
.download { display: inline-block; padding: 10px 20px; background: #007bff; color: white; text-decoration: none; border-radius: 5px; margin: 5px; }
.missing { color: #a00; }
.timestamp { color: #666; font-size: 0.9em; }";

/// Render the access page for a publish run.
///
/// Every file in the report is listed by its raw URL; files whose upload
/// failed are marked as such.
pub fn render_page(report: &PublishReport, settings: &PublishSettings, generated_at: DateTime<Utc>) -> String {
    let mut html = String::with_capacity(4096);
    let repo_url = format!("https://github.com/{}/{}", settings.owner, settings.repo);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str("<title>Illuvium Winning Builds - Data Access</title>\n");
    let _ = writeln!(html, "<style>\n{STYLE}\n</style>\n</head>\n<body>");

    html.push_str("<h1>Illuvium Winning Builds</h1>\n");
    html.push_str("<p>Latest winning builds from top-ranked Gauntlet players.</p>\n");
    let _ = writeln!(
        html,
        "<p class=\"timestamp\">Last updated: {}</p>",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    html.push_str("<div class=\"section\">\n<h2>Data files</h2>\n");
    for file in &report.files {
        let name = escape(&file.remote_path);
        if file.succeeded() {
            let _ = writeln!(
                html,
                "<a class=\"download\" href=\"{}\" download>{name}</a>",
                escape(&file.raw_url)
            );
        } else {
            let _ = writeln!(html, "<p class=\"missing\">{name}: not updated in this run</p>");
        }
    }
    html.push_str("</div>\n");

    html.push_str("<div class=\"section\">\n<h2>Endpoints</h2>\n<ul>\n");
    for file in &report.files {
        let _ = writeln!(
            html,
            "<li><strong>{}:</strong> <code>{}</code></li>",
            escape(&file.remote_path),
            escape(&file.raw_url)
        );
    }
    html.push_str("</ul>\n</div>\n");

    if let Some(first) = report.files.first() {
        html.push_str("<div class=\"section\">\n<h2>Example</h2>\n<pre><code>");
        let _ = write!(
            html,
            "fetch('{}')\n  .then(response =&gt; response.json())\n  .then(data =&gt; console.log(data));",
            escape(&first.raw_url)
        );
        html.push_str("</code></pre>\n</div>\n");
    }

    let _ = writeln!(
        html,
        "<footer><p><a href=\"{}\">View on GitHub</a></p></footer>\n</body>\n</html>",
        escape(&repo_url)
    );
    html
}

/// Write the page to `path`, replacing any previous version.
pub fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| GauntletError::io(parent, e))?;
    }
    std::fs::write(path, html).map_err(|e| GauntletError::io(path, e))?;
    info!(path = %path.display(), "wrote data access page");
    Ok(())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::PublishedFile;

    fn report() -> PublishReport {
        let settings = PublishSettings::default();
        PublishReport {
            files: vec![
                PublishedFile {
                    remote_path: "data/latest_builds.json".into(),
                    raw_url: settings.raw_url("data/latest_builds.json"),
                    download_url: Some("https://raw.example/latest".into()),
                },
                PublishedFile {
                    remote_path: "data/ranked_builds.json".into(),
                    raw_url: settings.raw_url("data/ranked_builds.json"),
                    download_url: None,
                },
            ],
        }
    }

    #[test]
    fn page_lists_raw_urls_and_marks_failures() {
        let at = Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap();
        let html = render_page(&report(), &PublishSettings::default(), at);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Last updated: 2024-06-02 08:00:00 UTC"));
        assert!(html.contains(
            "href=\"https://raw.githubusercontent.com/DickKingz/Overlay/main/data/latest_builds.json\""
        ));
        assert!(html.contains("data/ranked_builds.json: not updated in this run"));
        assert!(html.contains("https://github.com/DickKingz/Overlay"));
    }

    #[test]
    fn markup_in_paths_is_escaped() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn page_is_written_to_disk() {
        let dir = std::env::temp_dir().join(format!("gauntlet-page-{}", uuid::Uuid::now_v7()));
        let path = dir.join("builds_data_access.html");
        write_page(&path, "<html></html>").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html></html>");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
