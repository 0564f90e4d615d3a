// ABOUTME: Integration tests for the article pipeline against the bundled site definitions.
// ABOUTME: Each test feeds a saved-page style document through parse_article and checks the blocks.

use chrono::{TimeZone, Utc};
use newsroom_article::{load_builtin_registry, parse_article, CompiledSite, ContentBlock, ErrorCode};
use newsroom_feed::PreviewRecord;
use pretty_assertions::assert_eq;

fn compiled(name: &str) -> CompiledSite {
    load_builtin_registry()
        .get(name)
        .unwrap_or_else(|| panic!("missing builtin site {name}"))
        .compile()
        .unwrap()
}

fn preview(uri: &str) -> PreviewRecord {
    PreviewRecord::new(
        uri,
        Utc.with_ymd_and_hms(2024, 1, 15, 7, 0, 0).unwrap(),
        "Новость дня",
        None,
    )
}

fn p(text: &str) -> ContentBlock {
    ContentBlock::Paragraph(text.to_string())
}

const LGOTOTVET_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta property="og:image" content="/wp-content/uploads/lead.jpg">
  <title>Новость дня</title>
</head>
<body>
<article>
  <h1>Новость дня</h1>
  <h5>Кратко о   главном</h5>
  <div itemprop="articleBody">
    <p>Первый абзац текста.</p>
    <p>Фото: пресс-служба</p>
    <p><a class="article__post-link" href="/other">Читать также</a></p>
    <div class="alert">Подпишитесь на канал</div>
    <div class="article__quote">
      <div class="article__quote-marks"></div>
      <div class="article__quote-body">  Это   цитата  </div>
    </div>
    <figure><img src="/wp-content/uploads/body.jpg" alt=""></figure>
    <p>Последний <strong>абзац</strong>.</p>
    <script>window.counter = 1;</script>
  </div>
  <div itemprop="brand">Льготы</div>
</article>
</body>
</html>"#;

#[test]
fn lgototvet_article_yields_paragraphs_quote_and_image() {
    let post = parse_article(
        &compiled("lgototvet"),
        preview("https://lgototvet.ru/news/1"),
        LGOTOTVET_PAGE,
    )
    .unwrap();

    assert_eq!(
        post.image.as_deref(),
        Some("https://lgototvet.ru/wp-content/uploads/lead.jpg")
    );
    assert_eq!(post.description.as_deref(), Some("Кратко о главном"));
    assert_eq!(
        post.blocks,
        vec![
            p("Первый абзац текста."),
            ContentBlock::Quote("Это цитата".to_string()),
            ContentBlock::Image("https://lgototvet.ru/wp-content/uploads/body.jpg".to_string()),
            p("Последний абзац."),
        ]
    );
}

#[test]
fn marker_quote_two_levels_deep_is_one_quote() {
    let page = r#"<html><body><article><div itemprop="articleBody">
        <div class="quote-wrap">
          <div class="article__quote">
            <span class="article__quote-marks"></span>
            <div class="article__quote-body"><p>Одна</p><p>цитата</p></div>
          </div>
        </div>
        <p>После цитаты</p>
    </div></article></body></html>"#;

    let post = parse_article(&compiled("lgototvet"), preview("https://lgototvet.ru/news/2"), page)
        .unwrap();
    assert_eq!(
        post.blocks,
        vec![ContentBlock::Quote("Одна цитата".to_string()), p("После цитаты")]
    );
}

#[test]
fn zvezda_article_drops_source_embeds_and_read_more_tail() {
    let page = r#"<html><head>
        <meta property="og:image" content="https://zvezdagukovo.ru/wp-content/uploads/2024/01/lead.jpg">
        </head><body>
        <div class="entry-content">
          <p>Основной текст новости.</p>
          <p><img src="/wp-content/uploads/2024/01/a.jpg"></p>
          <figure class="wp-block-embed"><div>https://vk.com/video</div></figure>
          <p>Источник: администрация города</p>
          <p>Читайте также: <a href="/news/9">другая новость</a></p>
          <p>Ещё один абзац после ссылок</p>
        </div>
        </body></html>"#;

    let post = parse_article(
        &compiled("zvezda"),
        preview("https://zvezdagukovo.ru/news/1"),
        page,
    )
    .unwrap();

    assert_eq!(
        post.image.as_deref(),
        Some("https://zvezdagukovo.ru/wp-content/uploads/2024/01/lead.jpg")
    );
    assert_eq!(
        post.blocks,
        vec![
            p("Основной текст новости."),
            ContentBlock::Image("https://zvezdagukovo.ru/wp-content/uploads/2024/01/a.jpg".to_string()),
        ]
    );
}

#[test]
fn debri_dv_lead_image_comes_from_the_body_picture() {
    let page = r#"<html><body>
        <div class="article-body">
          <div class="bbcode-img-l"><img src="/uploads/posts/a.jpg"><div class="bbcode-img-description">Подпись к фото</div></div>
          <p>Текст новости о Дальнем Востоке.</p>
          <blockquote>Слова губернатора</blockquote>
        </div>
        </body></html>"#;

    let post = parse_article(&compiled("debri-dv"), preview("http://debri-dv.ru/news/1"), page)
        .unwrap();

    assert_eq!(post.image.as_deref(), Some("http://debri-dv.ru/uploads/posts/a.jpg"));
    assert_eq!(
        post.blocks,
        vec![
            ContentBlock::Image("http://debri-dv.ru/uploads/posts/a.jpg".to_string()),
            p("Текст новости о Дальнем Востоке."),
            ContentBlock::Quote("Слова губернатора".to_string()),
        ]
    );
}

#[test]
fn debri_dv_loose_text_runs_split_on_double_breaks() {
    let page = r#"<html><body>
        <div class="article-body">
          <div class="bbcode-img-l"><img src="/uploads/posts/b.jpg"><div class="bbcode-img-description">Подпись</div></div>
          Жители <b>Хабаровска</b> получили <a href="/x">выплаты</a>.<br><br>
          Второй <i>абзац</i> новости.<br>Продолжение.<br>
          <br>
          <blockquote>Слова мэра</blockquote>
          Итог.
        </div>
        </body></html>"#;

    let post = parse_article(&compiled("debri-dv"), preview("http://debri-dv.ru/news/3"), page)
        .unwrap();

    assert_eq!(
        post.blocks,
        vec![
            ContentBlock::Image("http://debri-dv.ru/uploads/posts/b.jpg".to_string()),
            p("Жители Хабаровска получили выплаты."),
            p("Второй абзац новости. Продолжение."),
            ContentBlock::Quote("Слова мэра".to_string()),
            p("Итог."),
        ]
    );
}

#[test]
fn body_with_nothing_left_after_purification_is_empty() {
    let page = r#"<html><body><div class="article-body">
        <script>track();</script>
        <p>   </p>
        <div class="bbcode-img-description">Подпись</div>
    </div></body></html>"#;

    let err = parse_article(&compiled("debri-dv"), preview("http://debri-dv.ru/news/2"), page)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::EmptyArticle);
    assert_eq!(err.url, "http://debri-dv.ru/news/2");
}

#[test]
fn post_record_serializes_to_json() {
    let post = parse_article(
        &compiled("lgototvet"),
        preview("https://lgototvet.ru/news/1"),
        LGOTOTVET_PAGE,
    )
    .unwrap();
    let value = serde_json::to_value(&post).unwrap();

    assert_eq!(value["uri"], "https://lgototvet.ru/news/1");
    assert_eq!(value["published_at"], "2024-01-15T07:00:00Z");
    assert_eq!(value["blocks"][1]["type"], "quote");
    assert_eq!(value["blocks"][1]["value"], "Это цитата");
}
