use axum::response::Html;

/// Minimal player page: paste a playlist URL, play it through `/m3u8-proxy`.
///
/// Uses hls.js where Media Source Extensions exist and falls back to native
/// HLS playback (Safari) otherwise.
const DEMO_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>hls-relay</title>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>
    body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; }
    form { display: flex; gap: .5rem; margin-bottom: 1rem; }
    input { flex: 1; padding: .4rem; }
    textarea { width: 100%; height: 4rem; font-family: monospace; }
    video { width: 100%; background: #000; }
  </style>
  <script src="https://cdn.jsdelivr.net/npm/hls.js@1"></script>
</head>
<body>
  <h1>hls-relay</h1>
  <form id="play">
    <input id="url" type="url" placeholder="https://example.com/stream.m3u8" required>
    <button type="submit">Play</button>
  </form>
  <label>Headers (JSON, optional)
    <textarea id="headers" placeholder='{"Referer": "https://example.com/"}'></textarea>
  </label>
  <video id="video" controls></video>
  <script>
    const video = document.getElementById("video");
    let hls = null;

    document.getElementById("play").addEventListener("submit", (event) => {
      event.preventDefault();
      const params = new URLSearchParams({ url: document.getElementById("url").value });
      const headers = document.getElementById("headers").value.trim();
      if (headers) params.set("headers", headers);
      const src = "/m3u8-proxy?" + params.toString();

      if (hls) { hls.destroy(); hls = null; }
      if (window.Hls && Hls.isSupported()) {
        hls = new Hls();
        hls.loadSource(src);
        hls.attachMedia(video);
      } else {
        video.src = src;
      }
      video.play().catch(() => {});
    });
  </script>
</body>
</html>
"##;

/// Serve the demo player page
pub async fn serve_demo() -> Html<&'static str> {
    Html(DEMO_PAGE)
}
