use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::style::Style;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

use super::scroll_state::ScrollState;

/// Render-ready representation of one row in a selection popup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct GenericDisplayRow {
    pub name: String,
    pub match_indices: Option<Vec<usize>>, // indices to bold (char positions)
    pub description: Option<String>,       // optional grey text after the name
}

/// Char positions of the first case-insensitive occurrence of `filter` in
/// `name`. Only computed for ASCII names, where byte and char offsets agree.
pub(crate) fn match_indices(name: &str, filter: &str) -> Option<Vec<usize>> {
    if filter.is_empty() || !name.is_ascii() {
        return None;
    }
    let start = name
        .to_ascii_lowercase()
        .find(&filter.to_ascii_lowercase())?;
    Some((start..start + filter.len()).collect())
}

/// First item index of the visible window so that the selection stays in
/// view.
pub(crate) fn compute_item_window_start(
    len: usize,
    state: &ScrollState,
    max_items: usize,
) -> usize {
    if len == 0 || max_items == 0 {
        return 0;
    }

    let mut start_idx = state.scroll_top.min(len.saturating_sub(1));
    if let Some(sel) = state.selected_idx {
        if sel < start_idx {
            start_idx = sel;
        } else {
            let bottom = start_idx.saturating_add(max_items.saturating_sub(1));
            if sel > bottom {
                start_idx = sel + 1 - max_items;
            }
        }
    }
    start_idx
}

/// Number of rows a list of `len` items occupies when rendered into `area`.
pub(crate) fn visible_item_count(len: usize, max_results: usize, area: Rect) -> usize {
    max_results.min(len).min(usize::from(area.height))
}

/// Map a terminal row to the index of the item drawn there by
/// [`render_rows_single_line`].
pub(crate) fn item_index_at_row(
    area: Rect,
    len: usize,
    state: &ScrollState,
    max_results: usize,
    row: u16,
) -> Option<usize> {
    if row < area.y {
        return None;
    }
    let offset = usize::from(row - area.y);
    let visible = visible_item_count(len, max_results, area);
    if offset >= visible {
        return None;
    }
    Some(compute_item_window_start(len, state, visible) + offset)
}

fn build_full_line(row: &GenericDisplayRow, desc_col: usize) -> Line<'static> {
    let mut name_spans: Vec<Span> = Vec::with_capacity(row.name.len());
    match row.match_indices.as_ref() {
        Some(idxs) => {
            let mut idx_iter = idxs.iter().peekable();
            for (char_idx, ch) in row.name.chars().enumerate() {
                if idx_iter.peek().is_some_and(|next| **next == char_idx) {
                    idx_iter.next();
                    name_spans.push(ch.to_string().bold());
                } else {
                    name_spans.push(ch.to_string().into());
                }
            }
        }
        None => name_spans.push(row.name.clone().into()),
    }

    let this_name_width = Line::from(name_spans.clone()).width();
    let mut full_spans: Vec<Span> = name_spans;
    if let Some(desc) = row.description.as_ref() {
        let gap = desc_col.saturating_sub(this_name_width).max(2);
        full_spans.push(" ".repeat(gap).into());
        full_spans.push(desc.clone().dim());
    }
    Line::from(full_spans)
}

fn truncate_line_with_ellipsis_if_overflow(line: Line<'static>, max_width: usize) -> Line<'static> {
    if line.width() <= max_width {
        return line;
    }
    let budget = max_width.saturating_sub(1);
    let mut used = 0usize;
    let mut spans: Vec<Span<'static>> = Vec::new();
    'outer: for span in line.spans {
        let mut kept = String::new();
        for ch in span.content.chars() {
            let w = ch.width().unwrap_or(0);
            if used + w > budget {
                if !kept.is_empty() {
                    spans.push(Span::styled(kept, span.style));
                }
                spans.push(Span::styled("…", span.style));
                break 'outer;
            }
            used += w;
            kept.push(ch);
        }
        spans.push(Span::styled(kept, span.style));
    }
    Line::from(spans)
}

/// Render a list of rows, one terminal line each, using the provided
/// ScrollState. The selected row is drawn cyan and bold. Returns the number of
/// lines rendered.
pub(crate) fn render_rows_single_line(
    area: Rect,
    buf: &mut Buffer,
    rows_all: &[GenericDisplayRow],
    state: &ScrollState,
    max_results: usize,
) -> u16 {
    let visible_items = visible_item_count(rows_all.len(), max_results, area);
    if visible_items == 0 {
        return 0;
    }
    let start_idx = compute_item_window_start(rows_all.len(), state, visible_items);

    let desc_col = rows_all
        .iter()
        .skip(start_idx)
        .take(visible_items)
        .map(|row| row.name.width())
        .max()
        .unwrap_or(0)
        .saturating_add(2);

    let mut cur_y = area.y;
    let mut rendered_lines: u16 = 0;
    for (i, row) in rows_all.iter().enumerate().skip(start_idx).take(visible_items) {
        let mut full_line = build_full_line(row, desc_col);
        if Some(i) == state.selected_idx {
            full_line.spans.iter_mut().for_each(|span| {
                span.style = Style::default().fg(Color::Cyan).bold();
            });
        }

        let full_line = truncate_line_with_ellipsis_if_overflow(full_line, usize::from(area.width));
        full_line.render(
            Rect {
                x: area.x,
                y: cur_y,
                width: area.width,
                height: 1,
            },
            buf,
        );
        cur_y = cur_y.saturating_add(1);
        rendered_lines = rendered_lines.saturating_add(1);
    }

    rendered_lines
}
