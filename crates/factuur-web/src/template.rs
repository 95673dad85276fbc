use axum::http::header;
use axum::response::{Html, IntoResponse};

const INDEX_HTML: &str = include_str!("../templates/index.html");
const APP_JS: &str = include_str!("../static/app.js");

/// Render the index page, flagging whether extraction is available.
pub fn render_index(extraction_enabled: bool) -> Html<String> {
    let banner = if extraction_enabled {
        ""
    } else {
        r#"<div class="banner">Extraction is disabled: set AZURE_DI_ENDPOINT and AZURE_DI_KEY.</div>"#
    };
    Html(INDEX_HTML.replace("{{ extraction_banner }}", banner))
}

/// Serve the page script with correct content type.
pub async fn serve_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        APP_JS,
    )
}
