//! Embedded HTML/CSS/JS frontend for the horizon web dashboard.
//!
//! The whole page is compiled into the binary as a string constant. It only
//! talks to the JSON API; charts are out of scope, values render as cards
//! and tables.

/// The complete single-page dashboard HTML.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>AI Horizon Scanner</title>
<style>
:root {
  --bg: #f6f8f7;
  --surface: #ffffff;
  --border: #d9dfdc;
  --text: #1f2a27;
  --text-muted: #66736f;
  --accent: #2f6f9f;
  --green: #2e8b57;
  --yellow: #b7791f;
  --red: #c0392b;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body { background: var(--bg); color: var(--text); font-family: var(--font); font-size: 14px; line-height: 1.5; }

.app { max-width: 1100px; margin: 0 auto; padding: 24px; }

header { margin-bottom: 20px; padding-bottom: 14px; border-bottom: 1px solid var(--border); display: flex; justify-content: space-between; align-items: flex-end; }
header h1 { font-size: 24px; font-weight: 600; }
header .subtitle { color: var(--text-muted); font-size: 13px; }

.badge { display: inline-block; padding: 3px 10px; border-radius: 12px; font-size: 12px; border: 1px solid var(--border); margin-left: 6px; }
.badge.ok { border-color: var(--green); color: var(--green); }
.badge.warn { border-color: var(--yellow); color: var(--yellow); }

.spotlight { background: #fff8e6; border: 1px solid #f0d99a; border-radius: var(--radius); padding: 14px 18px; margin-bottom: 20px; }
.spotlight h2 { font-size: 14px; margin-bottom: 6px; }

nav { display: flex; flex-wrap: wrap; gap: 4px; margin-bottom: 20px; background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius); padding: 4px; }
nav button { flex: 1; padding: 8px 12px; border: none; border-radius: 6px; background: transparent; color: var(--text-muted); font-size: 13px; cursor: pointer; }
nav button.active { background: var(--accent); color: #fff; }

.card { background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius); padding: 18px; margin-bottom: 16px; }
.card h2 { font-size: 16px; margin-bottom: 12px; }

details.why { margin-bottom: 16px; color: var(--text-muted); }
details.why summary { cursor: pointer; font-weight: 600; color: var(--text); }

.kpi-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); gap: 14px; }
.kpi { background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius); padding: 16px; }
.kpi .value { font-size: 26px; font-weight: 700; font-family: var(--mono); color: var(--accent); }
.kpi .value.na { color: var(--text-muted); }
.kpi .title { font-size: 12px; color: var(--text-muted); text-transform: uppercase; letter-spacing: 0.4px; }
.kpi .label { font-size: 13px; margin-top: 4px; }
.kpi .reason { font-size: 12px; color: var(--yellow); margin-top: 4px; }

table { width: 100%; border-collapse: collapse; font-size: 13px; }
th, td { text-align: left; padding: 7px 10px; border-bottom: 1px solid var(--border); }
th { color: var(--text-muted); font-weight: 500; font-size: 12px; text-transform: uppercase; }
td.num, th.num { text-align: right; font-family: var(--mono); }

.form-row { display: flex; flex-wrap: wrap; gap: 12px; align-items: flex-end; margin-bottom: 14px; }
.form-row label { display: flex; flex-direction: column; font-size: 12px; color: var(--text-muted); gap: 4px; }
select, input { padding: 6px 10px; border: 1px solid var(--border); border-radius: 6px; font-size: 13px; background: var(--surface); color: var(--text); }

.btn { padding: 7px 16px; border: 1px solid var(--border); border-radius: 6px; background: var(--surface); color: var(--text); font-size: 13px; cursor: pointer; text-decoration: none; }
.btn.primary { background: var(--accent); color: #fff; border-color: var(--accent); }
.btn.danger { border-color: var(--red); color: var(--red); }

.insights { display: flex; gap: 24px; margin: 12px 0; font-size: 13px; }
.error { color: var(--red); margin: 8px 0; }
.muted { color: var(--text-muted); }
textarea { width: 100%; min-height: 220px; font-family: var(--mono); font-size: 12px; padding: 10px; border: 1px solid var(--border); border-radius: 6px; }

.panel { display: none; }
.panel.active { display: block; }
</style>
</head>
<body>
<div class="app">

  <header>
    <div>
      <h1 id="title">AI Horizon Scanner</h1>
      <div class="subtitle" id="subtitle"></div>
    </div>
    <div id="health-badges"></div>
  </header>

  <div class="spotlight">
    <h2 id="spotlight-title">Weekly Spotlight</h2>
    <div id="spotlight-text"></div>
  </div>

  <nav id="nav"></nav>

  <div class="panel" id="panel-section">
    <details class="why"><summary>Why This Matters</summary><p id="why-text"></p></details>
    <div class="kpi-grid" id="kpi-grid"></div>
  </div>

  <div class="panel" id="panel-compare">
    <div class="card">
      <h2>Comparison Tool</h2>
      <div class="form-row">
        <label>Dimension<select id="cmp-dimension"></select></label>
        <label>Metric<select id="cmp-metric"></select></label>
        <label>From<input type="number" id="cmp-from" style="width:90px"></label>
        <label>To<input type="number" id="cmp-to" style="width:90px" placeholder="latest"></label>
        <button class="btn primary" id="cmp-run">Compare</button>
        <a class="btn" id="cmp-csv" href="#">Download CSV</a>
      </div>
      <div class="error" id="cmp-error"></div>
      <div class="insights" id="cmp-insights"></div>
      <table>
        <thead><tr><th>#</th><th id="cmp-group-header">Group</th><th class="num">Max</th></tr></thead>
        <tbody id="cmp-tbody"></tbody>
      </table>
    </div>
  </div>

  <div class="panel" id="panel-datasets">
    <div class="card">
      <h2>Datasets</h2>
      <table>
        <thead><tr><th>Dataset</th><th>Title</th><th class="num">Rows</th><th>Status</th></tr></thead>
        <tbody id="datasets-tbody"></tbody>
      </table>
    </div>
  </div>

  <div class="panel" id="panel-config">
    <div class="card">
      <h2>Configuration</h2>
      <p class="muted" style="margin-bottom:12px">Effective configuration. Edits are written to <code>~/.horizon/config.toml</code>.</p>
      <textarea id="config-toml" readonly></textarea>
      <div class="form-row" style="margin-top:14px">
        <label>Key<input type="text" id="cfg-key" placeholder="data.dir"></label>
        <label>Value<input type="text" id="cfg-value"></label>
        <button class="btn primary" id="cfg-save">Set</button>
        <button class="btn danger" id="cfg-reset">Reset to defaults</button>
      </div>
      <div class="error" id="cfg-error"></div>
    </div>
  </div>

</div>

<script>
// ---------------------------------------------------------------------------
// API helper
// ---------------------------------------------------------------------------
async function api(method, path, body) {
  const opts = { method, headers: {} };
  if (body !== undefined) {
    opts.headers['Content-Type'] = 'application/json';
    opts.body = JSON.stringify(body);
  }
  const res = await fetch(path, opts);
  const data = await res.json();
  if (!res.ok) {
    const err = new Error(data.error || res.statusText);
    err.dataGap = !!data.data_gap;
    throw err;
  }
  return data;
}

function esc(s) {
  if (s === null || s === undefined) return '';
  return String(s).replace(/&/g,'&amp;').replace(/</g,'&lt;').replace(/>/g,'&gt;').replace(/"/g,'&quot;');
}

function compact(n) {
  const a = Math.abs(n);
  if (a >= 1e15) return n.toExponential(2);
  for (const [s, u] of [[1e12,'T'],[1e9,'B'],[1e6,'M'],[1e3,'K']]) {
    if (a >= s) return (n / s).toFixed(1) + u;
  }
  return String(Math.round(n * 100) / 100);
}

function formatValue(v, unit) {
  switch (unit) {
    case 'usd': return '$' + compact(v);
    case 'count': return Math.round(v).toLocaleString();
    case 'percent': return v.toFixed(1) + '%';
    case 'percent_points': return (v >= 0 ? '+' : '') + v.toFixed(1) + ' pp';
    case 'index': return v.toFixed(3);
    default: return compact(v);
  }
}

const METRIC_UNITS = { 'training-cost': 'usd', 'system-count': 'count', 'patents': 'count' };

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------
let options = null;

function showPanel(id) {
  document.querySelectorAll('.panel').forEach(p => p.classList.remove('active'));
  document.getElementById('panel-' + id).classList.add('active');
}

function selectTab(btn) {
  document.querySelectorAll('#nav button').forEach(b => b.classList.remove('active'));
  btn.classList.add('active');
}

async function loadOverview() {
  const o = await api('GET', '/api/sections');
  document.getElementById('title').textContent = o.title;
  document.getElementById('subtitle').textContent = o.subtitle;
  document.getElementById('spotlight-title').textContent = 'Weekly Spotlight (Week ' + o.spotlight.week + ')';
  document.getElementById('spotlight-text').textContent = o.spotlight.finding;

  const nav = document.getElementById('nav');
  const tabs = o.sections.map(s => ({ id: s.slug, label: s.title, why: s.why_it_matters }));
  tabs.push({ id: 'compare', label: 'Comparison Tool' });
  tabs.push({ id: 'datasets', label: 'Datasets' });
  tabs.push({ id: 'config', label: 'Configuration' });

  nav.innerHTML = '';
  tabs.forEach((t, i) => {
    const btn = document.createElement('button');
    btn.textContent = t.label;
    btn.addEventListener('click', () => {
      selectTab(btn);
      if (t.id === 'compare') { showPanel('compare'); }
      else if (t.id === 'datasets') { showPanel('datasets'); loadDatasets(); }
      else if (t.id === 'config') { showPanel('config'); loadConfig(); }
      else { showPanel('section'); loadSection(t.id, t.why); }
    });
    nav.appendChild(btn);
    if (i === 0) btn.click();
  });
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------
async function loadSection(slug, why) {
  document.getElementById('why-text').textContent = why;
  const grid = document.getElementById('kpi-grid');
  grid.innerHTML = '<div class="muted">Loading…</div>';
  try {
    const report = await api('GET', '/api/kpis?section=' + encodeURIComponent(slug));
    grid.innerHTML = report.kpis.map(k => {
      if (k.status === 'available') {
        return `<div class="kpi"><div class="title">${esc(k.title)}</div>
          <div class="value">${esc(formatValue(k.value, k.unit))}</div>
          <div class="label">${esc(k.label)}</div></div>`;
      }
      const shown = k.data_gap ? 'N/A' : 'Error';
      return `<div class="kpi"><div class="title">${esc(k.title)}</div>
        <div class="value na">${shown}</div><div class="reason ${k.data_gap ? '' : 'error'}">${esc(k.reason)}</div></div>`;
    }).join('');
  } catch (e) {
    grid.innerHTML = `<div class="error">${esc(e.message)}</div>`;
  }
}

// ---------------------------------------------------------------------------
// Comparison tool
// ---------------------------------------------------------------------------
async function loadOptions() {
  options = await api('GET', '/api/options');
  const dim = document.getElementById('cmp-dimension');
  dim.innerHTML = options.dimensions.map(d => `<option value="${esc(d.value)}">${esc(d.label)}</option>`).join('');
  document.getElementById('cmp-from').value = options.default_start_year;
  dim.addEventListener('change', fillMetrics);
  fillMetrics();
}

function fillMetrics() {
  const dim = document.getElementById('cmp-dimension').value;
  const d = options.dimensions.find(x => x.value === dim);
  document.getElementById('cmp-metric').innerHTML =
    d.metrics.map(m => `<option value="${esc(m.value)}">${esc(m.label)}</option>`).join('');
  document.getElementById('cmp-group-header').textContent = d.label;
}

function compareQuery() {
  const params = new URLSearchParams({
    dimension: document.getElementById('cmp-dimension').value,
    metric: document.getElementById('cmp-metric').value,
  });
  const from = document.getElementById('cmp-from').value;
  const to = document.getElementById('cmp-to').value;
  if (from) params.set('from', from);
  if (to) params.set('to', to);
  return params;
}

document.getElementById('cmp-run').addEventListener('click', async () => {
  const err = document.getElementById('cmp-error');
  const tbody = document.getElementById('cmp-tbody');
  const ins = document.getElementById('cmp-insights');
  err.textContent = '';
  tbody.innerHTML = '';
  ins.innerHTML = '';
  try {
    const r = await api('GET', '/api/compare?' + compareQuery());
    const unit = METRIC_UNITS[r.metric];
    if (r.rows.length === 0) {
      err.textContent = 'No rows in the selected range.';
      return;
    }
    tbody.innerHTML = r.rows.map((row, i) =>
      `<tr><td>${i + 1}</td><td>${esc(row.group)}</td><td class="num">${esc(formatValue(row.value, unit))}</td></tr>`).join('');
    const parts = [];
    if (r.insights.leader) parts.push(`<span><b>Leader:</b> ${esc(r.insights.leader.group)}</span>`);
    if (r.insights.trailing) parts.push(`<span><b>Trailing:</b> ${esc(r.insights.trailing.group)}</span>`);
    if (r.insights.top3_share !== null) parts.push(`<span><b>Top 3 share:</b> ${r.insights.top3_share.toFixed(1)}%</span>`);
    ins.innerHTML = parts.join('');
  } catch (e) {
    err.textContent = e.dataGap ? 'No data available: ' + e.message : e.message;
  }
});

document.getElementById('cmp-csv').addEventListener('click', (ev) => {
  ev.preventDefault();
  const params = compareQuery();
  params.set('format', 'csv');
  window.location = '/api/compare?' + params;
});

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------
async function loadDatasets() {
  const rows = await api('GET', '/api/datasets');
  document.getElementById('datasets-tbody').innerHTML = rows.map(d =>
    `<tr><td><code>${esc(d.dataset)}</code></td><td>${esc(d.title)}</td>
      <td class="num">${d.rows === null ? '' : d.rows.toLocaleString()}</td>
      <td>${d.error ? `<span class="error">${esc(d.error)}</span>` : 'loaded'}
        ${d.unknown_labels.length ? `<div class="muted">Unrecognised: ${esc(d.unknown_labels.join(', '))}</div>` : ''}</td></tr>`).join('');
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------
async function loadConfig() {
  const c = await api('GET', '/api/config');
  document.getElementById('config-toml').value = c.toml_text;
}

document.getElementById('cfg-save').addEventListener('click', async () => {
  const err = document.getElementById('cfg-error');
  err.textContent = '';
  const key = document.getElementById('cfg-key').value.trim();
  const value = document.getElementById('cfg-value').value;
  try {
    const r = await api('PUT', '/api/config', { updates: [{ key, value }] });
    if (!r.success) err.textContent = r.errors.join('; ');
    loadConfig();
    loadHealth();
  } catch (e) {
    err.textContent = e.message;
  }
});

document.getElementById('cfg-reset').addEventListener('click', async () => {
  if (!confirm('Reset all configuration to defaults? This overwrites ~/.horizon/config.toml.')) return;
  await api('POST', '/api/config/reset');
  loadConfig();
  loadHealth();
});

// ---------------------------------------------------------------------------
// Health badges
// ---------------------------------------------------------------------------
async function loadHealth() {
  try {
    const h = await api('GET', '/api/health');
    const ok = h.datasets_loaded === h.datasets_total;
    document.getElementById('health-badges').innerHTML =
      `<span class="badge ${ok ? 'ok' : 'warn'}">Datasets ${h.datasets_loaded}/${h.datasets_total}</span>` +
      `<span class="badge ${h.config_exists ? 'ok' : 'warn'}">Config</span>`;
  } catch (e) {
    // Badges are decoration only
  }
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------
loadHealth();
loadOptions();
loadOverview();
</script>
</body>
</html>"##;
