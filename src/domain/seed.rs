//! Built-in sample articles for populating an empty instance.
//!
//! Each entry exercises a different slice of the block vocabulary so a
//! freshly seeded feed demonstrates the renderer end to end.

use crate::domain::blocks::{
    BlockKind, ChecklistBlock, ChecklistItem, CodeBlock, ContentBlock, EmbedBlock, ListBlock,
    ListStyle, QuoteBlock, TableBlock, WarningBlock,
};
use crate::domain::document::BlockDocument;

pub struct SeedArticle {
    pub title: &'static str,
    pub tags: &'static [&'static str],
    pub document: BlockDocument,
}

pub fn seed_articles() -> Vec<SeedArticle> {
    vec![
        SeedArticle {
            title: "Signals Are Eating the Virtual DOM",
            tags: &["coding", "technology"],
            document: BlockDocument::new(vec![
                ContentBlock::header("A Quieter Kind of Reactivity", 2),
                ContentBlock::paragraph(
                    "Fine-grained reactivity has moved from research curiosity to shipping \
                     default. Instead of re-rendering a tree and diffing the result, \
                     signal-based frameworks subscribe each DOM binding to exactly the \
                     state it reads.",
                ),
                ContentBlock::new(BlockKind::Quote(QuoteBlock {
                    text: "The fastest diff is the one you never compute.".into(),
                    caption: Some("conference hallway wisdom".into()),
                })),
                ContentBlock::paragraph("A counter in a signal-based framework stays tiny:"),
                ContentBlock::new(BlockKind::Code(CodeBlock {
                    code: "const count = signal(0);\n\neffect(() => {\n  label.textContent = `clicked ${count.value} times`;\n});".into(),
                })),
                ContentBlock::paragraph(
                    "The update path touches one text node. No reconciliation, no keys, \
                     no memo annotations.",
                ),
            ]),
        },
        SeedArticle {
            title: "A Field Guide to Practical Data Cleaning",
            tags: &["coding", "python", "data"],
            document: BlockDocument::new(vec![
                ContentBlock::header("Where Analyses Actually Fail", 2),
                ContentBlock::paragraph(
                    "Most modeling projects do not die in the model. They die in the \
                     loader, on the third CSV whose date column silently switched \
                     formats.",
                ),
                ContentBlock::new(BlockKind::List(ListBlock {
                    style: ListStyle::Unordered,
                    items: vec![
                        "Validate column types at ingest, not at fit time".into(),
                        "Quarantine rows that fail parsing instead of dropping them".into(),
                        "Keep a manifest of every transformation applied".into(),
                    ],
                })),
                ContentBlock::new(BlockKind::Code(CodeBlock {
                    code: "frame = load(\"survey.csv\")\nreport = frame.validate(schema)\nreport.quarantined.to_csv(\"holding_pen.csv\")".into(),
                })),
                ContentBlock::new(BlockKind::Delimiter),
                ContentBlock::paragraph(
                    "Treat the cleaning pipeline as a product of its own and the model \
                     downstream becomes boring in the best way.",
                ),
            ]),
        },
        SeedArticle {
            title: "Coalition Forms Around Open Evaluation of Frontier Models",
            tags: &["news", "ai"],
            document: BlockDocument::new(vec![
                ContentBlock::header("Shared Benchmarks, Shared Stakes", 2),
                ContentBlock::paragraph(
                    "Twelve research labs announced a joint evaluation consortium this \
                     week, agreeing to publish capability assessments under a common \
                     methodology before major releases.",
                ),
                ContentBlock::new(BlockKind::Table(TableBlock {
                    with_headings: true,
                    content: vec![
                        vec!["Pillar".into(), "Commitment".into()],
                        vec!["Transparency".into(), "Public eval cards per release".into()],
                        vec!["Accountability".into(), "Third-party audit access".into()],
                        vec!["Safety".into(), "Incident disclosure within 30 days".into()],
                    ],
                })),
                ContentBlock::paragraph(
                    "Critics note that self-selected benchmarks can flatter, but the \
                     consortium's audit clause gives the agreement unusual teeth.",
                ),
            ]),
        },
        SeedArticle {
            title: "Reusable Boosters and the New Cost Curve of Orbit",
            tags: &["news", "space"],
            document: BlockDocument::new(vec![
                ContentBlock::paragraph(
                    "Another booster flew for the twentieth time this month, and almost \
                     nobody noticed. Routine is the real milestone.",
                ),
                ContentBlock::header("What Changed", 2),
                ContentBlock::new(BlockKind::List(ListBlock {
                    style: ListStyle::Ordered,
                    items: vec![
                        "Landing became the default, not the experiment".into(),
                        "Refurbishment dropped from months to weeks".into(),
                        "Launch pricing started quoting the airframe's amortized life".into(),
                    ],
                })),
                ContentBlock::new(BlockKind::Warning(WarningBlock {
                    title: Some("Caveat".into()),
                    message: "Per-kilogram figures below are operator-reported and \
                              unaudited."
                        .into(),
                })),
                ContentBlock::new(BlockKind::Embed(EmbedBlock {
                    embed: "https://player.example.org/launch-replay".into(),
                    caption: Some("Replay of the twentieth flight".into()),
                })),
            ]),
        },
        SeedArticle {
            title: "Welcome to Pedium: The Art of Storytelling",
            tags: &["pedium", "writing"],
            document: BlockDocument::new(vec![
                ContentBlock::header("Share Your Voice", 1),
                ContentBlock::paragraph(
                    "Pedium is a canvas for your thoughts. The editor stays out of the \
                     way so the words can do the work.",
                ),
                ContentBlock::new(BlockKind::Checklist(ChecklistBlock {
                    items: vec![
                        ChecklistItem {
                            text: "Create an account".into(),
                            checked: true,
                        },
                        ChecklistItem {
                            text: "Customize your profile".into(),
                            checked: true,
                        },
                        ChecklistItem {
                            text: "Write your first story".into(),
                            checked: false,
                        },
                    ],
                })),
                ContentBlock::paragraph(
                    "Follow writers you admire, respond to the pieces that move you, \
                     and build an audience of your own. Welcome home.",
                ),
            ]),
        },
    ]
}
