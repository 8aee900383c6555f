use crate::identity::UserId;
use crate::layout::{Theme, TrackerLayout};
use crate::models::mood_key;

pub fn render_index(layout: &TrackerLayout, user: Option<&UserId>) -> String {
    let user_line = match user {
        Some(user) => format!("Your User ID: {}", escape_html(user.as_str())),
        None => "Sign-in unavailable. Progress will not be saved.".to_string(),
    };
    INDEX_HTML
        .replace("{{THEME_CSS}}", &theme_css())
        .replace("{{TITLE}}", &escape_html(&layout.title))
        .replace("{{SUBTITLE}}", &escape_html(&layout.subtitle))
        .replace("{{USER_LINE}}", &user_line)
        .replace("{{EMOJI_KEY}}", &emoji_key_items())
}

fn theme_css() -> String {
    Theme::ALL
        .iter()
        .map(|theme| {
            let style = theme.style();
            format!(
                ".theme-{name} h2 {{ color: {heading}; }}\n\
                 .theme-{name} .prefix {{ color: {prefix}; }}\n\
                 .theme-{name} .cell.tick {{ background: {fill}; border-color: {border}; color: #fff; }}\n",
                name = theme.as_str(),
                heading = style.heading,
                prefix = style.prefix,
                fill = style.tick_fill,
                border = style.tick_border,
            )
        })
        .collect()
}

fn emoji_key_items() -> String {
    mood_key()
        .iter()
        .map(|entry| {
            format!(
                "<li><span class=\"emoji\">{}</span> {}</li>",
                entry.emoji,
                escape_html(entry.caption)
            )
        })
        .collect::<Vec<_>>()
        .join("\n          ")
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <link rel="manifest" href="/manifest.webmanifest" />
  <style>
    :root {
      --bg: #f9fafb;
      --ink: #1f2937;
      --muted: #6b7280;
      --card: #ffffff;
      --line: #d1d5db;
      --miss: #ef4444;
      --miss-border: #f87171;
      --shadow: 0 4px 14px rgba(31, 41, 55, 0.08);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: system-ui, -apple-system, "Segoe UI", sans-serif;
    }

    .app {
      max-width: 56rem;
      margin: 0 auto;
      padding: 24px 16px 48px;
    }

    header {
      text-align: center;
      margin-bottom: 32px;
    }

    header h1 {
      font-size: 2rem;
      margin: 0;
    }

    header p {
      color: var(--muted);
      margin: 8px 0 0;
    }

    .install {
      margin-top: 12px;
      padding: 8px 16px;
      border: none;
      border-radius: 8px;
      background: #3b82f6;
      color: #fff;
      font-weight: 600;
      cursor: pointer;
    }

    .install[hidden] {
      display: none;
    }

    header .user {
      font-size: 0.75rem;
      word-break: break-all;
    }

    .badge {
      display: inline-block;
      padding: 4px 10px;
      font-size: 0.85rem;
      font-weight: 600;
      color: #4b5563;
      background: #f3f4f6;
      border: 1px solid #e5e7eb;
      border-radius: 999px;
      margin: 24px 0 12px;
    }

    .card {
      background: var(--card);
      border: 1px solid #e5e7eb;
      border-radius: 16px;
      box-shadow: var(--shadow);
      padding: 16px;
    }

    .card h2 {
      font-size: 1rem;
      margin: 0 0 12px;
    }

    .row {
      display: flex;
      align-items: center;
      gap: 8px;
      margin-bottom: 8px;
    }

    .prefix {
      width: 1rem;
      font-weight: 700;
      text-align: center;
    }

    .weeks {
      display: flex;
      flex-wrap: wrap;
      gap: 8px;
    }

    .week {
      display: flex;
      gap: 4px;
      padding: 4px 8px;
      border-radius: 999px;
      background: #f3f4f6;
    }

    .cell {
      width: 20px;
      height: 20px;
      border: 2px solid var(--line);
      border-radius: 50%;
      background: #fff;
      color: transparent;
      font-size: 11px;
      line-height: 16px;
      text-align: center;
      cursor: pointer;
      transition: all 200ms ease;
      padding: 0;
    }

    .cell:hover {
      background: #e5e7eb;
    }

    .cell.cross {
      color: var(--miss);
      border-color: var(--miss-border);
      background: #fff;
    }

    .mood {
      margin-left: 8px;
      font-size: 1.5rem;
    }

    .status {
      min-height: 1.2em;
      text-align: center;
      font-size: 0.85rem;
      color: var(--muted);
    }

    .status[data-type="error"] {
      color: var(--miss);
    }

    footer ul {
      list-style: none;
      padding: 0;
      margin: 0;
      color: #4b5563;
      font-size: 0.9rem;
    }

    footer li {
      margin-bottom: 8px;
    }

    footer .emoji {
      font-size: 1.25rem;
      margin-right: 8px;
    }

{{THEME_CSS}}
  </style>
</head>
<body>
  <div class="app">
    <header>
      <h1>{{TITLE}}</h1>
      <p>{{SUBTITLE}}</p>
      <p class="user">{{USER_LINE}}</p>
      <button type="button" class="install" id="install" hidden>Add to Home Screen</button>
    </header>

    <main id="blocks"></main>
    <p class="status" id="status"></p>

    <footer class="card">
      <h2>Emoji Key</h2>
      <ul>
          {{EMOJI_KEY}}
      </ul>
    </footer>
  </div>

  <script>
    const blocksEl = document.getElementById('blocks');
    const statusEl = document.getElementById('status');
    const installEl = document.getElementById('install');
    const MARKS = { tick: '✓', cross: '✕', blank: '' };
    const NEXT = { blank: 'tick', tick: 'cross', cross: 'blank' };
    let tracker = null;
    let installPrompt = null;

    window.addEventListener('beforeinstallprompt', (event) => {
      event.preventDefault();
      installPrompt = event;
      installEl.hidden = false;
    });

    installEl.addEventListener('click', async () => {
      if (!installPrompt) {
        return;
      }
      installPrompt.prompt();
      const choice = await installPrompt.userChoice;
      if (choice.outcome === 'accepted') {
        console.log('User accepted the install prompt');
      } else {
        console.log('User dismissed the install prompt');
      }
      installPrompt = null;
      installEl.hidden = true;
    });

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const renderRow = (block, row) => {
      const rowEl = document.createElement('div');
      rowEl.className = 'row';

      const prefix = document.createElement('span');
      prefix.className = 'prefix';
      prefix.textContent = row.prefix;
      rowEl.appendChild(prefix);

      const weeksEl = document.createElement('div');
      weeksEl.className = 'weeks';
      row.weeks.forEach((week) => {
        const weekEl = document.createElement('div');
        weekEl.className = 'week';
        week.forEach((cell) => {
          const cellEl = document.createElement('button');
          cellEl.type = 'button';
          cellEl.className = `cell ${cell.status}`;
          cellEl.title = cell.title;
          cellEl.textContent = MARKS[cell.status];
          cellEl.addEventListener('click', () => {
            toggle(block.label, cell.index).catch((err) => setStatus(err.message, 'error'));
          });
          weekEl.appendChild(cellEl);
        });
        weeksEl.appendChild(weekEl);
      });
      rowEl.appendChild(weeksEl);

      const mood = document.createElement('span');
      mood.className = 'mood';
      mood.textContent = row.emoji;
      mood.title = `${row.ticks} ticks, ${row.crosses} crosses`;
      rowEl.appendChild(mood);
      return rowEl;
    };

    const renderBlock = (block) => {
      const section = document.createElement('section');
      if (block.badge) {
        const badge = document.createElement('span');
        badge.className = 'badge';
        badge.textContent = block.badge;
        section.appendChild(badge);
      }
      const card = document.createElement('div');
      card.className = `card theme-${block.theme}`;
      const title = document.createElement('h2');
      title.textContent = block.label;
      card.appendChild(title);
      block.rows.forEach((row) => card.appendChild(renderRow(block, row)));
      section.appendChild(card);
      return section;
    };

    const render = () => {
      if (!tracker) {
        return;
      }
      blocksEl.replaceChildren(...tracker.blocks.map(renderBlock));
    };

    const loadTracker = async () => {
      const res = await fetch('/api/tracker');
      if (!res.ok) {
        throw new Error('Unable to load tracker');
      }
      tracker = await res.json();
      render();
    };

    const flipLocally = (label, index) => {
      const block = tracker.blocks.find((b) => b.label === label);
      const cell = block && block.rows.flatMap((row) => row.weeks.flat()).find((c) => c.index === index);
      if (cell) {
        cell.status = NEXT[cell.status];
        render();
      }
    };

    const toggle = async (label, index) => {
      if (!tracker || !tracker.persisting) {
        setStatus('Not signed in. Progress cannot be saved.', 'error');
        return;
      }
      flipLocally(label, index);
      const res = await fetch('/api/toggle', {
        method: 'POST',
        headers: { 'content-type': 'application/json' },
        body: JSON.stringify({ label, index })
      });
      if (!res.ok) {
        const msg = await res.text();
        await loadTracker();
        throw new Error(msg || 'Request failed');
      }
      const updated = await res.json();
      tracker.blocks = tracker.blocks.map((block) => (block.label === updated.label ? updated : block));
      render();
      setStatus('', '');
    };

    loadTracker().catch((err) => setStatus(err.message, 'error'));
    setInterval(() => {
      loadTracker().catch((err) => setStatus(err.message, 'error'));
    }, 5000);
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_includes_layout_and_user() {
        let user = UserId::for_tests("abc-123");
        let page = render_index(&TrackerLayout::default(), Some(&user));
        assert!(page.contains("<title>Tana&#39;s Financial Skills Tracker</title>"));
        assert!(page.contains("Your User ID: abc-123"));
        assert!(page.contains(".theme-purple .cell.tick"));
        assert!(page.contains("Absolutely crushed it!"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn page_offers_install_prompt() {
        let page = render_index(&TrackerLayout::default(), None);
        assert!(page.contains(r#"<link rel="manifest" href="/manifest.webmanifest" />"#));
        assert!(page.contains("beforeinstallprompt"));
        assert!(page.contains(r#"id="install" hidden>Add to Home Screen</button>"#));
        assert!(page.contains("User accepted the install prompt"));
        assert!(page.contains("User dismissed the install prompt"));
    }

    #[test]
    fn clicks_flip_the_cell_before_the_request() {
        let page = render_index(&TrackerLayout::default(), None);
        let flip = page.find("flipLocally(label, index);").unwrap();
        let request = page.find("fetch('/api/toggle'").unwrap();
        assert!(flip < request);
        assert!(page.contains("{ blank: 'tick', tick: 'cross', cross: 'blank' }"));
    }

    #[test]
    fn page_without_user_warns() {
        let page = render_index(&TrackerLayout::default(), None);
        assert!(page.contains("Progress will not be saved"));
    }

    #[test]
    fn titles_are_escaped() {
        let mut layout = TrackerLayout::default();
        layout.title = "<b>Me & you</b>".to_string();
        let page = render_index(&layout, None);
        assert!(page.contains("&lt;b&gt;Me &amp; you&lt;/b&gt;"));
    }
}
