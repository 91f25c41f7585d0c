use emails2telegram::format::chunk::TEXT_LIMIT;
use emails2telegram::format::render_blocks;
use emails2telegram::mail::extract::{NO_PLAIN_TEXT_BODY, extract_message};

#[test]
fn long_newsletter_becomes_ordered_bounded_blocks() {
    let mut body = String::new();
    for i in 0..400 {
        body.push_str(&format!(
            "Item {i}: read more at https://news.example.com/a/{i}?utm_source=mail   \r\n\r\n\r\n"
        ));
    }
    let raw = format!(
        concat!(
            "From: =?UTF-8?B?0J/RgNC40LLQtdGC?= <news@example.com>\r\n",
            "Subject: Weekly digest\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "\r\n",
            "{}"
        ),
        body
    );

    let email = extract_message(raw.as_bytes()).expect("parse");
    assert!(email.from.starts_with("Привет"));

    let blocks = render_blocks(&email.render());
    assert!(blocks.len() > 1);
    for b in &blocks {
        assert!(b.chars().count() <= TEXT_LIMIT);
        assert!(!b.contains("\n\n\n"));
        assert!(!b.contains(" \n"));
    }

    // every link survives, in order, with its query string
    let joined = blocks.join("\n");
    let mut pos = 0;
    for i in 0..400 {
        let target = format!("(https://news.example.com/a/{i}?utm_source=mail)");
        let found = joined[pos..].find(&target).expect("link present");
        pos += found + target.len();
    }
}

#[test]
fn html_only_mail_still_produces_a_message() {
    let raw = concat!(
        "From: shop@example.com\r\n",
        "Subject: Sale!\r\n",
        "Content-Type: text/html; charset=utf-8\r\n",
        "\r\n",
        "<html><body>50% off</body></html>",
    );
    let email = extract_message(raw.as_bytes()).expect("parse");
    assert_eq!(email.body, NO_PLAIN_TEXT_BODY);

    let blocks = render_blocks(&email.render());
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].contains("Subject: Sale\\!"));
    assert!(blocks[0].ends_with("can't render it"));
}
