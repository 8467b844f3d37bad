use pedium::application::render::block_renderer;
use pedium::domain::document::BlockDocument;
use pedium::domain::extract;

fn load_story() -> BlockDocument {
    BlockDocument::parse(include_str!("fixtures/story_blocks.json")).expect("fixture parses")
}

#[test]
fn story_fixture_html_snapshot_matches() {
    let renderer = block_renderer();
    let document = load_story();

    let html = renderer.render_document(&document);

    let expected = include_str!("fixtures/story_rendered.html");
    assert_eq!(expected.trim_end(), html.trim_end());
}

#[test]
fn story_fixture_plain_text_snapshot_matches() {
    let document = load_story();

    let plain = extract::plain_text(&document.blocks);

    let expected = include_str!("fixtures/story_plain.txt");
    assert_eq!(expected.trim_end(), plain.trim_end());
}

#[test]
fn story_fixture_speech_text_snapshot_matches() {
    let document = load_story();

    let speech = extract::speech_text(&document.blocks);

    let expected = include_str!("fixtures/story_speech.txt");
    assert_eq!(expected.trim_end(), speech.trim_end());
}

#[test]
fn story_fixture_handles_hostile_and_unknown_blocks() {
    let renderer = block_renderer();
    let html = renderer.render_document(&load_story());

    assert!(
        html.contains("if depth &lt; 2.0"),
        "code block text should render as escaped literal text"
    );
    assert!(
        html.contains("<aside class=\"field-note\">"),
        "raw block markup should pass through unchanged"
    );
    assert!(
        !html.contains("poll"),
        "unknown block types should render to nothing"
    );
}
