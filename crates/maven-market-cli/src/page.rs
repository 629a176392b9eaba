//! Single-page dashboard served at `/`.
//!
//! The page only holds the controls; every change calls `/api/dashboard`
//! and hands the returned figure to Plotly.

pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Maven vs. Market Candlestick</title>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
<style>
  body { background-color: #222; color: white; font-family: sans-serif; margin: 0; padding: 20px; }
  h1, .intro, .controls { text-align: center; }
  .controls { margin: 20px; }
  select { width: 300px; color: black; }
  #kpi-container { display: flex; justify-content: center; gap: 20px; margin-bottom: 20px; }
  .kpi-card { border: 1px solid #444; padding: 10px; width: 180px; text-align: center;
              border-radius: 5px; background-color: #333; color: white; }
  .notice { color: red; }
  #price-graph { height: 600px; }
</style>
</head>
<body>
<h1>Maven vs. Coffee Market (Candlestick)</h1>
<div class="intro">
  <p>Data source for market prices: Yahoo Finance (Coffee KC=F).</p>
  <p>Candlestick: Up if today's price is higher than yesterday's close, down otherwise.</p>
</div>
<div class="controls">
  <label for="product-dropdown">Select a Product:</label><br>
  <select id="product-dropdown"></select><br><br>
  <label>Select Date Range:</label><br>
  <input type="date" id="start-date"> &ndash; <input type="date" id="end-date"><br>
  <button id="reset-date-btn" style="margin-top: 10px">Reset Date Range</button>
</div>
<div id="kpi-container"></div>
<div id="price-graph"></div>
<script>
  const product = document.getElementById("product-dropdown");
  const start = document.getElementById("start-date");
  const end = document.getElementById("end-date");
  const kpis = document.getElementById("kpi-container");
  let clicks = 0;

  async function getJson(url) {
    const response = await fetch(url);
    return response.json();
  }

  function renderKpis(body) {
    kpis.replaceChildren();
    if (body.notice) {
      const notice = document.createElement("div");
      notice.className = "notice";
      notice.textContent = body.notice;
      kpis.appendChild(notice);
      return;
    }
    for (const card of body.kpis) {
      const div = document.createElement("div");
      div.className = "kpi-card";
      const label = document.createElement("h3");
      label.textContent = card.label;
      const value = document.createElement("p");
      value.textContent = card.value;
      div.append(label, value);
      kpis.appendChild(div);
    }
  }

  async function update() {
    const params = new URLSearchParams({ product: product.value, start: start.value, end: end.value });
    const body = await getJson("/api/dashboard?" + params);
    if (body.error) {
      kpis.textContent = body.error;
      return;
    }
    renderKpis(body);
    Plotly.react("price-graph", body.figure.data, body.figure.layout);
  }

  async function init() {
    const catalog = await getJson("/api/catalog");
    for (const name of catalog.products) {
      const option = document.createElement("option");
      option.value = name;
      option.textContent = name;
      product.appendChild(option);
    }
    if (catalog.default_product) product.value = catalog.default_product;
    for (const input of [start, end]) {
      input.min = catalog.date_bounds.min;
      input.max = catalog.date_bounds.max;
    }
    start.value = catalog.date_bounds.min;
    end.value = catalog.date_bounds.max;
    await update();
  }

  product.addEventListener("change", update);
  start.addEventListener("change", update);
  end.addEventListener("change", update);
  document.getElementById("reset-date-btn").addEventListener("click", async () => {
    clicks += 1;
    const range = await getJson("/api/reset?n_clicks=" + clicks);
    if (range.start && range.end) {
      start.value = range.start;
      end.value = range.end;
      await update();
    }
  });

  init();
</script>
</body>
</html>
"##;
