use maud::{html, Markup, DOCTYPE};

const STYLE: &str = "
body { font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem; color: #222; }
header { display: flex; align-items: center; justify-content: space-between; border-bottom: 1px solid #ddd; margin-bottom: 1rem; }
.card { border: 1px solid #e2e2e2; border-radius: 8px; padding: 1rem; margin-bottom: 1rem; }
.stats { display: grid; grid-template-columns: repeat(auto-fill, minmax(160px, 1fr)); gap: 0.75rem; }
.stat { display: flex; flex-direction: column; }
.stat-label { font-size: 0.85rem; color: #666; }
.stat-value { font-size: 1.3rem; font-weight: 600; }
.phase-idle { color: #15803d; } .phase-scraping { color: #1d4ed8; } .phase-error { color: #b91c1c; } .phase-starting { color: #666; }
table { width: 100%; border-collapse: collapse; } td, th { text-align: left; padding: 4px 6px; border-bottom: 1px solid #eee; }
button { padding: 6px 14px; cursor: pointer; }
";

pub fn desktop_layout(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="bg" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                meta http-equiv="refresh" content="30";
                title { (title) }
                style { (maud::PreEscaped(STYLE)) }
            }
            body {
                header {
                    h3 { "Imot Scraper" }
                    nav {
                        a href="/" { "Dashboard" }
                        " · "
                        a href="/api/status" { "Status JSON" }
                        " · "
                        a href="/health" { "Health" }
                    }
                }
                (content)
            }
        }
    }
}
