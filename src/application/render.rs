//! Block renderer: canonical blocks to display markup.
//!
//! Pure and total. Every block type has a fixed layout rule; an unknown
//! type renders to nothing. Trusted inline HTML (header, paragraph, list
//! items, checklist text, warning message, table cells) is injected
//! without re-escaping: the interactive editor is the only producer of
//! those fields and this trust boundary is deliberate. Code is always
//! escaped to literal text, `raw` is always verbatim.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::domain::blocks::{
    BlockKind, ChecklistBlock, CodeBlock, ContentBlock, EmbedBlock, HeaderBlock, ImageBlock,
    ListBlock, QuoteBlock, RawBlock, TableBlock, WarningBlock,
};
use crate::domain::document::BlockDocument;

/// Heading presentation used when a header's level is absent or outside 1..4.
const DEFAULT_HEADER_LEVEL: i64 = 2;

/// Shared renderer instance.
pub fn block_renderer() -> Arc<BlockRenderer> {
    static RENDERER: Lazy<Arc<BlockRenderer>> = Lazy::new(|| Arc::new(BlockRenderer::new()));
    Arc::clone(&RENDERER)
}

#[derive(Debug, Default)]
pub struct BlockRenderer;

impl BlockRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render one block to a markup fragment; `""` for unknown types.
    pub fn render_block(&self, block: &ContentBlock) -> String {
        let mut out = String::new();
        self.render_into(&mut out, block);
        out
    }

    /// Render a whole document, newline-joined, skipping empty fragments.
    pub fn render_document(&self, document: &BlockDocument) -> String {
        let mut fragments = Vec::with_capacity(document.blocks.len());
        for block in &document.blocks {
            let fragment = self.render_block(block);
            if !fragment.is_empty() {
                fragments.push(fragment);
            }
        }
        fragments.join("\n")
    }

    fn render_into(&self, out: &mut String, block: &ContentBlock) {
        match &block.kind {
            BlockKind::Header(header) => render_header(out, header),
            BlockKind::Paragraph(paragraph) => {
                out.push_str("<p class=\"article-paragraph\">");
                out.push_str(&paragraph.text);
                out.push_str("</p>");
            }
            BlockKind::List(list) => render_list(out, list),
            BlockKind::Checklist(checklist) => render_checklist(out, checklist),
            BlockKind::Quote(quote) => render_quote(out, quote),
            BlockKind::Warning(warning) => render_warning(out, warning),
            BlockKind::Table(table) => render_table(out, table),
            BlockKind::Delimiter => {
                out.push_str("<div class=\"article-delimiter\">...</div>");
            }
            BlockKind::Code(code) => render_code(out, code),
            BlockKind::Raw(raw) => render_raw(out, raw),
            BlockKind::Embed(embed) => render_embed(out, embed),
            BlockKind::Image(image) => render_image(out, image),
            // Suggestions never reach rendering; if one slips through it
            // degrades exactly like an unknown type.
            BlockKind::ImageSuggestion(_) => {}
            BlockKind::Unknown { .. } => {}
        }
    }
}

fn render_header(out: &mut String, header: &HeaderBlock) {
    let level = match header.level {
        Some(level @ 1..=4) => level,
        _ => DEFAULT_HEADER_LEVEL,
    };
    out.push_str(&format!("<h{level} class=\"article-heading\">"));
    out.push_str(&header.text);
    out.push_str(&format!("</h{level}>"));
}

fn render_list(out: &mut String, list: &ListBlock) {
    let tag = if list.style.is_ordered() { "ol" } else { "ul" };
    out.push_str(&format!("<{tag} class=\"article-list\">"));
    for item in &list.items {
        out.push_str("<li>");
        out.push_str(item);
        out.push_str("</li>");
    }
    out.push_str(&format!("</{tag}>"));
}

fn render_checklist(out: &mut String, checklist: &ChecklistBlock) {
    out.push_str("<div class=\"article-checklist\">");
    for item in &checklist.items {
        if item.checked {
            out.push_str(
                "<div class=\"article-checklist-item is-checked\">\
                 <span class=\"article-checklist-mark\"></span>\
                 <span class=\"article-checklist-text is-done\">",
            );
        } else {
            out.push_str(
                "<div class=\"article-checklist-item\">\
                 <span class=\"article-checklist-mark\"></span>\
                 <span class=\"article-checklist-text\">",
            );
        }
        out.push_str(&item.text);
        out.push_str("</span></div>");
    }
    out.push_str("</div>");
}

fn render_quote(out: &mut String, quote: &QuoteBlock) {
    out.push_str("<blockquote class=\"article-quote\">\u{201c}");
    out.push_str(&escape(&quote.text));
    out.push('\u{201d}');
    if let Some(caption) = present(&quote.caption) {
        out.push_str("<cite>\u{2014} ");
        out.push_str(&escape(caption));
        out.push_str("</cite>");
    }
    out.push_str("</blockquote>");
}

fn render_warning(out: &mut String, warning: &WarningBlock) {
    let title = present(&warning.title).unwrap_or("Note");
    out.push_str("<div class=\"article-warning\"><div class=\"article-warning-title\">");
    out.push_str(&escape(title));
    out.push_str("</div><div class=\"article-warning-message\">");
    out.push_str(&warning.message);
    out.push_str("</div></div>");
}

fn render_table(out: &mut String, table: &TableBlock) {
    out.push_str("<div class=\"article-table\"><table><tbody>");
    for (row_index, row) in table.content.iter().enumerate() {
        let header_row = table.with_headings && row_index == 0;
        out.push_str("<tr>");
        for cell in row {
            let tag = if header_row { "th" } else { "td" };
            out.push_str(&format!("<{tag}>"));
            out.push_str(cell);
            out.push_str(&format!("</{tag}>"));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table></div>");
}

fn render_code(out: &mut String, code: &CodeBlock) {
    out.push_str("<pre class=\"article-code\"><code>");
    out.push_str(&escape(&code.code));
    out.push_str("</code></pre>");
}

fn render_raw(out: &mut String, raw: &RawBlock) {
    out.push_str("<div class=\"article-raw\">");
    out.push_str(&raw.html);
    out.push_str("</div>");
}

fn render_embed(out: &mut String, embed: &EmbedBlock) {
    // padding-top 56.25% keeps the frame at 16:9 whatever the content is.
    out.push_str(
        "<div class=\"article-embed\">\
         <div class=\"article-embed-frame\" style=\"padding-top:56.25%\">\
         <iframe src=\"",
    );
    out.push_str(&escape(&embed.embed));
    out.push_str(
        "\" frameborder=\"0\" \
         allow=\"autoplay; encrypted-media; picture-in-picture\" \
         allowfullscreen></iframe></div>",
    );
    if let Some(caption) = present(&embed.caption) {
        out.push_str("<div class=\"article-embed-caption\">");
        out.push_str(&escape(caption));
        out.push_str("</div>");
    }
    out.push_str("</div>");
}

fn render_image(out: &mut String, image: &ImageBlock) {
    out.push_str("<figure class=\"article-image\"><img src=\"");
    out.push_str(&escape(&image.file.url));
    out.push_str("\" alt=\"");
    if let Some(caption) = present(&image.caption) {
        out.push_str(&escape(caption));
    }
    out.push_str("\">");
    if let Some(caption) = present(&image.caption) {
        out.push_str("<figcaption>");
        out.push_str(&escape(caption));
        out.push_str("</figcaption>");
    }
    out.push_str("</figure>");
}

fn escape(input: &str) -> String {
    crate::util::html::escape_html(input)
}

/// Treat an empty caption the same as an absent one.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}
