use anyhow::Result;
use folio_core::{
    Animator, FolioConfig, MediaBackend, MemoryPage, NodeId, Page, Point, Rect, Site,
    SubmitOutcome,
};

struct Fixture {
    navbar: NodeId,
    video: NodeId,
    hero: NodeId,
    stickers: NodeId,
    services: NodeId,
    heading: NodeId,
    sticker: NodeId,
    items: Vec<NodeId>,
    codify: NodeId,
}

fn portfolio_page() -> (MemoryPage, Fixture) {
    let mut page = MemoryPage::new(1280.0, 800.0);

    let navbar = page.add(None, "nav.navbar");
    page.set_fixed(navbar, true);
    page.set_rect(navbar, Rect::new(0.0, 0.0, 1280.0, 60.0));

    let container = page.add(None, "div.video-container");
    page.set_rect(container, Rect::new(0.0, 0.0, 1280.0, 800.0));
    let video = page.add(Some(container), "video#myVideo");
    page.add(Some(container), "div#visualizer");
    page.add(Some(container), "button#muteBtn");

    let hero = page.add(None, "h1.hero-text");
    page.set_rect(hero, Rect::new(0.0, 200.0, 1280.0, 200.0));
    let stickers = page.add(None, "div.stickers-container");

    let services = page.add(None, "section.services-section");
    page.set_rect(services, Rect::new(0.0, 1600.0, 1280.0, 800.0));
    let heading = page.add(Some(services), "h2");
    page.seed_text(heading, "Services");
    page.set_rect(heading, Rect::new(0.0, 1650.0, 600.0, 80.0));
    let sticker = page.add(Some(services), "img.services-sticker");
    let items = (0..3)
        .map(|_| page.add(Some(services), "li.service-item"))
        .collect();

    let codify = page.add(None, "span.codify-text[data-text=\"HI\"]");
    page.set_rect(codify, Rect::new(0.0, 3000.0, 200.0, 40.0));

    let form = page.add(None, "form#contact-form[action=\"/submit\"]");
    let send = page.add(Some(form), "button#send-button");
    page.seed_text(send, "Send");

    (
        page,
        Fixture {
            navbar,
            video,
            hero,
            stickers,
            services,
            heading,
            sticker,
            items,
            codify,
        },
    )
}

fn build(page: MemoryPage, config: &FolioConfig) -> Site<MemoryPage> {
    Site::with_animator(page, config, Animator::with_seed(2024))
}

fn forward_media_events(site: &mut Site<MemoryPage>) -> bool {
    let events = site.page_mut().take_media_events();
    let mut sampling = false;
    for event in events {
        sampling = site.on_media_event(event);
    }
    sampling
}

#[test]
fn load_reveals_hero_and_starts_video() -> Result<()> {
    let (page, f) = portfolio_page();
    let mut site = build(page, &FolioConfig::default());

    let effects = site.on_load();
    assert!(!effects.navbar_visible);
    assert_eq!(effects.video_in_view, Some(true));
    assert!(site.page().has_class(f.hero, "visible"));
    assert!(site.page().has_class(f.stickers, "visible"));
    assert!(!site.page().has_class(f.services, "animated"));

    assert!(forward_media_events(&mut site));
    assert_eq!(site.page_mut().query_all(".bar").len(), 20);
    assert!(site.on_visualizer_frame());
    Ok(())
}

#[test]
fn services_cascade_follows_configured_delays() -> Result<()> {
    let (page, f) = portfolio_page();
    let mut site = build(page, &FolioConfig::default());
    site.on_load();

    // Below the 0.2 threshold nothing happens
    assert_eq!(site.on_intersection(f.services, 0.1, true), 0);
    assert_eq!(site.on_intersection(f.services, 0.25, true), 1);

    site.tick(99.0);
    assert!(!site.page().has_class(f.sticker, "visible"));
    site.tick(1.0);
    assert!(site.page().has_class(f.sticker, "visible"));
    assert!(!site.page().has_class(f.items[0], "visible"));

    site.tick(200.0);
    assert!(site.page().has_class(f.items[0], "visible"));
    assert!(!site.page().has_class(f.items[1], "visible"));
    site.tick(150.0);
    assert!(site.page().has_class(f.items[1], "visible"));
    site.tick(150.0);
    assert!(site.page().has_class(f.items[2], "visible"));
    assert!(!site.tick(1.0));
    Ok(())
}

#[test]
fn heading_letters_reveal_once() -> Result<()> {
    let (page, f) = portfolio_page();
    let mut site = build(page, &FolioConfig::default());

    assert_eq!(site.on_intersection(f.heading, 0.4, true), 1);
    let letters = site.page_mut().query_all(".letter");
    assert_eq!(letters.len(), 8);
    site.tick(50.0 * 8.0);
    assert!(
        letters
            .iter()
            .all(|&l| site.page().style(l, "opacity").as_deref() == Some("1"))
    );

    let mutations = site.page().mutation_count();
    for _ in 0..3 {
        site.on_intersection(f.heading, 0.0, false);
        assert_eq!(site.on_intersection(f.heading, 1.0, true), 0);
    }
    site.tick(1000.0);
    assert_eq!(site.page().mutation_count(), mutations);
    assert_eq!(site.page_mut().query_all(".letter").len(), 8);
    Ok(())
}

#[test]
fn scramble_reveals_hi() -> Result<()> {
    let (page, f) = portfolio_page();
    let config = FolioConfig::from_toml_str("[scramble]\ncharset = \"#\"\n")?;
    let mut site = build(page, &config);

    assert_eq!(site.on_intersection(f.codify, 0.6, true), 1);
    for _ in 0..10 {
        site.tick(10.0);
    }
    let history = site.page().text_history(f.codify);
    assert_eq!(history, vec!["", "#", "H", "H#", "HI"]);
    for frame in &history {
        let committed = frame.trim_end_matches('#');
        assert!("HI".starts_with(committed));
        assert!(frame.len() <= committed.len() + 1);
    }
    assert!(site.page().has_class(f.codify, "codified"));

    site.on_intersection(f.codify, 0.0, false);
    assert_eq!(site.on_intersection(f.codify, 1.0, true), 0);
    Ok(())
}

#[test]
fn scrolling_drives_navbar_and_video() -> Result<()> {
    let (page, f) = portfolio_page();
    let mut site = build(page, &FolioConfig::default());
    site.on_load();
    forward_media_events(&mut site);

    site.page_mut().set_scroll_y(51.0);
    site.on_scroll();
    assert!(site.page().has_class(f.navbar, "visible"));

    site.page_mut().set_scroll_y(1600.0);
    let effects = site.on_scroll();
    assert!(effects.navbar_inverted);
    assert_eq!(effects.video_in_view, Some(false));
    assert!(!forward_media_events(&mut site));
    assert!(!site.on_visualizer_frame());

    site.page_mut().set_scroll_y(0.0);
    site.on_scroll();
    assert!(!site.page().has_class(f.navbar, "visible"));
    assert!(forward_media_events(&mut site));

    site.page_mut().set_ended(f.video, true);
    site.page_mut().set_scroll_y(10.0);
    site.on_scroll();
    assert!(site.page_mut().take_media_events().is_empty());
    Ok(())
}

#[test]
fn autoplay_rejection_offers_play_button() -> Result<()> {
    let (mut page, f) = portfolio_page();
    page.set_autoplay_allowed(false);
    let mut site = build(page, &FolioConfig::default());

    site.on_load();
    assert!(!forward_media_events(&mut site));
    let button = site
        .page_mut()
        .query(".play-btn")
        .expect("fallback button");

    site.page_mut().set_autoplay_allowed(true);
    assert!(!site.on_click(button).prevent_default);
    assert!(site.page_mut().query(".play-btn").is_none());
    assert!(!site.page().is_paused(f.video));
    assert!(forward_media_events(&mut site));
    Ok(())
}

#[test]
fn cancelling_stops_pending_reveals() -> Result<()> {
    let (page, f) = portfolio_page();
    let mut site = build(page, &FolioConfig::default());

    site.on_intersection(f.services, 1.0, true);
    site.tick(350.0);
    assert!(site.page().has_class(f.items[0], "visible"));
    site.cancel_all();
    let mutations = site.page().mutation_count();
    site.tick(5000.0);
    assert!(!site.page().has_class(f.items[1], "visible"));
    assert_eq!(site.page().mutation_count(), mutations);
    assert!(!site.needs_animation_frame());
    Ok(())
}

#[test]
fn evasive_button_through_site() -> Result<()> {
    let mut page = MemoryPage::default();
    let list = page.add(None, "ul.services-list");
    page.set_rect(list, Rect::new(0.0, 0.0, 600.0, 300.0));
    let button = page.add(Some(list), "button");
    page.set_rect(button, Rect::new(280.0, 130.0, 40.0, 40.0));
    let mut site = build(page, &FolioConfig::default());

    assert_eq!(site.on_pointer_move(Point::new(350.0, 150.0)), 1);
    let (dx, dy) = site.evader().offset(button).unwrap_or_default();
    assert!((dx + 75.0).abs() < 1e-9);
    assert!(dy.abs() < 1e-9);

    assert_eq!(site.on_pointer_move(Point::new(500.0, 150.0)), 1);
    assert_eq!(site.evader().offset(button), Some((0.0, 0.0)));
    Ok(())
}

#[test]
fn contact_form_round_trip() -> Result<()> {
    let (page, _) = portfolio_page();
    let mut site = build(page, &FolioConfig::default());

    let request = site.on_submit().expect("request");
    assert_eq!(request.action, "/submit");
    assert!(site.on_submit().is_none());
    site.on_submit_result(SubmitOutcome::Status(200));
    assert_eq!(site.page().navigations(), &["thankyou.html".to_string()]);
    Ok(())
}
