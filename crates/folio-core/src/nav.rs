//! Navigation affordances: smooth-scroll links, project rows and the
//! carousel cursor follower.

use folio_config::NavigationConfig;
use tracing::{debug, info};

use crate::dom::{NodeId, Page};
use crate::geometry::Point;
use crate::selectors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScrollLink {
    selector: &'static str,
    source: NodeId,
    target: NodeId,
}

/// Elements that smooth-scroll another element into view when clicked.
#[derive(Debug, Clone, Default)]
pub struct ScrollLinks {
    links: Vec<ScrollLink>,
}

impl ScrollLinks {
    /// Links whose source or target is missing are dropped.
    pub fn attach(page: &mut dyn Page) -> Self {
        let pairs = [
            (selectors::SCROLL_BUTTON, selectors::INTRO_SECTION),
            (selectors::PROJECT_LINK, selectors::PROJECT_TABLE),
        ];
        let links = pairs
            .iter()
            .filter_map(|&(source, target)| {
                Some(ScrollLink {
                    selector: source,
                    source: page.query(source)?,
                    target: page.query(target)?,
                })
            })
            .collect::<Vec<_>>();
        debug!(links = links.len(), "scroll links attached");
        Self { links }
    }

    pub fn sources(&self) -> Vec<NodeId> {
        self.links.iter().map(|l| l.source).collect()
    }

    /// Scroll to the target of the link containing `target`. Returns `true`
    /// when the click was handled and its default navigation must be
    /// suppressed.
    pub fn on_click(&self, page: &mut dyn Page, target: NodeId) -> bool {
        let link = self
            .links
            .iter()
            .find(|l| page.closest(target, l.selector) == Some(l.source));
        match link {
            Some(link) => {
                page.scroll_into_view(link.target);
                true
            }
            None => false,
        }
    }
}

/// Rows of the selected-works table.
#[derive(Debug, Clone, Default)]
pub struct ProjectRows {
    rows: Vec<NodeId>,
    expand_max_width: f64,
}

impl ProjectRows {
    /// Makes every row keyboard-focusable.
    pub fn attach(page: &mut dyn Page, config: &NavigationConfig) -> Self {
        let rows = page.query_all(selectors::PROJECT_ROW);
        for &row in &rows {
            page.set_attribute(row, "tabindex", "0");
        }
        Self {
            rows,
            expand_max_width: config.expand_max_width,
        }
    }

    pub fn rows(&self) -> &[NodeId] {
        &self.rows
    }

    /// Row containing `target`, if it is one of ours.
    pub fn row_of(&self, page: &mut dyn Page, target: NodeId) -> Option<NodeId> {
        page.closest(target, selectors::PROJECT_ROW)
            .filter(|row| self.rows.contains(row))
    }

    /// Activate the row containing `target`: log the project and, on narrow
    /// viewports, toggle its expanded state. Returns the project name.
    pub fn on_click(&self, page: &mut dyn Page, target: NodeId) -> Option<String> {
        let row = self.row_of(page, target)?;
        let name = page
            .query_within(row, selectors::PROJECT_NAME)
            .first()
            .map(|&n| page.text(n).trim().to_string())
            .unwrap_or_default();
        info!(project = %name, "project clicked");
        if page.viewport().width <= self.expand_max_width {
            page.toggle_class(row, selectors::EXPANDED);
        }
        Some(name)
    }

    /// Enter and Space activate a row. Returns `true` when the key was
    /// consumed.
    pub fn on_key(&self, page: &mut dyn Page, target: NodeId, key: &str) -> bool {
        match key {
            "Enter" | " " => self.on_click(page, target).is_some(),
            _ => false,
        }
    }
}

/// Badge that trails the pointer over the carousel.
#[derive(Debug, Clone, Copy)]
pub struct CursorFollower {
    carousel: NodeId,
    follower: NodeId,
}

impl CursorFollower {
    pub fn attach(page: &mut dyn Page) -> Option<Self> {
        Some(Self {
            carousel: page.query(selectors::CAROUSEL)?,
            follower: page.query(selectors::CURSOR_FOLLOWER)?,
        })
    }

    pub fn carousel(&self) -> NodeId {
        self.carousel
    }

    pub fn on_enter(&self, page: &mut dyn Page) {
        page.add_class(self.follower, selectors::VISIBLE);
    }

    pub fn on_leave(&self, page: &mut dyn Page) {
        page.remove_class(self.follower, selectors::VISIBLE);
    }

    pub fn on_move(&self, page: &mut dyn Page, pointer: Point) {
        page.set_style(self.follower, "left", &format!("{}px", pointer.x));
        page.set_style(self.follower, "top", &format!("{}px", pointer.y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryPage;
    use crate::geometry::Rect;

    #[test]
    fn test_scroll_links() {
        let mut page = MemoryPage::default();
        let button = page.add(None, "button#scrollBtn");
        let intro = page.add(None, "section#intro-section");
        page.set_rect(intro, Rect::new(0.0, 900.0, 1280.0, 500.0));
        let orphan = page.add(None, "a[href=\"#project-table\"]");

        let links = ScrollLinks::attach(&mut page);
        assert_eq!(links.sources(), vec![button]);
        assert!(links.on_click(&mut page, button));
        assert_eq!(page.scrolled_into_view(), &[intro]);
        assert_eq!(page.scroll_y(), 900.0);
        assert!(!links.on_click(&mut page, orphan));
    }

    fn rows_page(width: f64) -> (MemoryPage, NodeId) {
        let mut page = MemoryPage::new(width, 800.0);
        let table = page.add(None, "table#project-table");
        let row = page.add(Some(table), "tr.project-row");
        let name = page.add(Some(row), "td.project-name");
        page.seed_text(name, "  Orbit  ");
        (page, row)
    }

    #[test]
    fn test_click_inside_row_resolves_row() {
        let (mut page, row) = rows_page(1280.0);
        let rows = ProjectRows::attach(&mut page, &NavigationConfig::default());
        assert_eq!(rows.rows(), &[row]);
        let cell = page.query(".project-name").unwrap();
        assert_eq!(rows.row_of(&mut page, cell), Some(row));
        assert_eq!(rows.on_click(&mut page, cell).as_deref(), Some("Orbit"));
        let outside = page.add(None, "p");
        assert_eq!(rows.on_click(&mut page, outside), None);
    }

    #[test]
    fn test_rows_are_focusable() {
        let (mut page, row) = rows_page(1280.0);
        ProjectRows::attach(&mut page, &NavigationConfig::default());
        assert_eq!(page.attribute(row, "tabindex").as_deref(), Some("0"));
    }

    #[test]
    fn test_row_click_expands_only_on_narrow_viewports() {
        let (mut page, row) = rows_page(1280.0);
        let rows = ProjectRows::attach(&mut page, &NavigationConfig::default());
        assert_eq!(rows.on_click(&mut page, row).as_deref(), Some("Orbit"));
        assert!(!page.has_class(row, "expanded"));

        let (mut page, row) = rows_page(430.0);
        let rows = ProjectRows::attach(&mut page, &NavigationConfig::default());
        rows.on_click(&mut page, row);
        assert!(page.has_class(row, "expanded"));
        rows.on_click(&mut page, row);
        assert!(!page.has_class(row, "expanded"));
    }

    #[test]
    fn test_keyboard_activation() {
        let (mut page, row) = rows_page(400.0);
        let rows = ProjectRows::attach(&mut page, &NavigationConfig::default());
        assert!(rows.on_key(&mut page, row, "Enter"));
        assert!(page.has_class(row, "expanded"));
        assert!(rows.on_key(&mut page, row, " "));
        assert!(!page.has_class(row, "expanded"));
        assert!(!rows.on_key(&mut page, row, "a"));
    }

    #[test]
    fn test_cursor_follower() {
        let mut page = MemoryPage::default();
        assert!(CursorFollower::attach(&mut page).is_none());
        page.add(None, "div.carousel");
        let badge = page.add(None, "div.cursor-follower");
        let follower = CursorFollower::attach(&mut page).unwrap();

        follower.on_enter(&mut page);
        follower.on_move(&mut page, Point::new(12.0, 34.5));
        assert!(page.has_class(badge, "visible"));
        assert_eq!(page.style(badge, "left").as_deref(), Some("12px"));
        assert_eq!(page.style(badge, "top").as_deref(), Some("34.5px"));
        follower.on_leave(&mut page);
        assert!(!page.has_class(badge, "visible"));
    }
}
