use maud::{html, Markup};

pub mod card;

pub use card::card;

/// One labelled counter.
pub fn stat(label: &str, value: impl maud::Render) -> Markup {
    html! {
        div class="stat" {
            span class="stat-label" { (label) }
            span class="stat-value" { (value) }
        }
    }
}
