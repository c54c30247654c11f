use axum::extract::Path;
use axum::response::Html;

/// `GET /meet/{room_name}` (spec.md §6) — public, no auth. Hosting the real
/// meeting UI is out of core scope; this returns a minimal placeholder page
/// so the route exists alongside the rest of the HTTP surface.
pub async fn meet_page(Path(room_name): Path<String>) -> Html<String> {
    let escaped = room_name
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;");
    Html(format!(
        "<!doctype html><html><head><title>pailflow</title></head><body>\
         <p>Room: {escaped}</p></body></html>"
    ))
}
