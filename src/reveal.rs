//! Scroll reveal for page sections.
//!
//! Sections (`.section`) and the trust bar (`.trust-bar`) start hidden and
//! fade in the first time they scroll into view. Each one gains its visible
//! class exactly once and is then dropped from observation, so scrolling back
//! never hides it again. Nothing is persisted between page loads.
//!
//! When the reader prefers reduced motion, nothing is observed and every
//! section is visible from the start.
//!
//! Viewport intersection is the [`ViewportObserver`] capability. The page
//! script drives it with the platform's intersection observer;
//! [`GeometricObserver`] computes the same entries from section rectangles so
//! the reveal logic runs headless.

use log::debug;
use std::collections::BTreeSet;
use std::sync::Mutex;

/// Fraction of a section that must be visible before it is revealed.
pub const REVEAL_THRESHOLD: f64 = 0.1;

/// Bottom root margin in CSS pixels. Negative shrinks the viewport, so a
/// section must be slightly past the bottom edge before it counts.
pub const REVEAL_BOTTOM_MARGIN: f64 = -40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Section,
    TrustBar,
}

impl SectionKind {
    /// Classify an element by its `class` attribute. The trust bar wins when
    /// an element carries both classes.
    pub fn from_classes(classes: &str) -> Option<Self> {
        let mut kind = None;
        for class in classes.split_ascii_whitespace() {
            match class {
                "trust-bar" => return Some(SectionKind::TrustBar),
                "section" => kind = Some(SectionKind::Section),
                _ => {}
            }
        }
        kind
    }

    pub fn visible_class(self) -> &'static str {
        match self {
            SectionKind::Section => "section--visible",
            SectionKind::TrustBar => "trust-bar--visible",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverOptions {
    pub threshold: f64,
    pub bottom_margin: f64,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            threshold: REVEAL_THRESHOLD,
            bottom_margin: REVEAL_BOTTOM_MARGIN,
        }
    }
}

/// One observation reported for a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: usize,
    pub ratio: f64,
    pub is_intersecting: bool,
}

/// Viewport intersection, as the page's intersection observer provides it.
///
/// Targets are section indices.
pub trait ViewportObserver {
    fn observe(&self, target: usize);
    fn unobserve(&self, target: usize);
}

#[derive(Debug)]
struct SectionState {
    kind: SectionKind,
    visible: bool,
}

#[derive(Debug)]
pub struct ScrollReveal {
    sections: Vec<SectionState>,
}

impl ScrollReveal {
    pub fn start(kinds: &[SectionKind], reduced_motion: bool, observer: &dyn ViewportObserver) -> Self {
        let sections = kinds
            .iter()
            .map(|&kind| SectionState {
                kind,
                visible: reduced_motion,
            })
            .collect();
        if reduced_motion {
            debug!("reduced motion: revealing {} sections immediately", kinds.len());
        } else {
            (0..kinds.len()).for_each(|target| observer.observe(target));
        }
        Self { sections }
    }

    /// Reveal every intersecting section not yet visible.
    ///
    /// Returns the newly revealed targets in entry order.
    pub fn on_intersections(&mut self, entries: &[IntersectionEntry], observer: &dyn ViewportObserver) -> Vec<usize> {
        let mut revealed = Vec::new();
        for entry in entries.iter().filter(|e| e.is_intersecting) {
            let Some(section) = self.sections.get_mut(entry.target) else {
                continue;
            };
            if section.visible {
                continue;
            }
            section.visible = true;
            observer.unobserve(entry.target);
            revealed.push(entry.target);
        }
        revealed
    }

    pub fn is_visible(&self, target: usize) -> bool {
        self.sections.get(target).is_some_and(|s| s.visible)
    }

    /// The class to add for `target`, once it is visible.
    pub fn visible_class(&self, target: usize) -> Option<&'static str> {
        self.sections
            .get(target)
            .filter(|s| s.visible)
            .map(|s| s.kind.visible_class())
    }

    pub fn all_visible(&self) -> bool {
        self.sections.iter().all(|s| s.visible)
    }
}

/// A section's vertical extent in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub height: f64,
}

/// Intersection computed from rectangles and a scroll position.
#[derive(Debug)]
pub struct GeometricObserver {
    options: ObserverOptions,
    viewport_height: f64,
    rects: Vec<Rect>,
    observed: Mutex<BTreeSet<usize>>,
}

impl GeometricObserver {
    pub fn new(options: ObserverOptions, viewport_height: f64, rects: Vec<Rect>) -> Self {
        Self {
            options,
            viewport_height,
            rects,
            observed: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn observed(&self) -> Vec<usize> {
        self.observed
            .lock()
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Entries for every observed target with the viewport scrolled to `scroll_y`.
    pub fn entries_at(&self, scroll_y: f64) -> Vec<IntersectionEntry> {
        let root_top = scroll_y;
        let root_bottom = scroll_y + self.viewport_height + self.options.bottom_margin;
        self.observed()
            .into_iter()
            .filter_map(|target| {
                let rect = self.rects.get(target)?;
                let overlap = (rect.top + rect.height).min(root_bottom) - rect.top.max(root_top);
                let ratio = if rect.height > 0.0 {
                    (overlap / rect.height).clamp(0.0, 1.0)
                } else if overlap >= 0.0 {
                    1.0
                } else {
                    0.0
                };
                Some(IntersectionEntry {
                    target,
                    ratio,
                    is_intersecting: overlap >= 0.0 && ratio >= self.options.threshold,
                })
            })
            .collect()
    }
}

impl ViewportObserver for GeometricObserver {
    fn observe(&self, target: usize) {
        if let Ok(mut set) = self.observed.lock() {
            set.insert(target);
        }
    }

    fn unobserve(&self, target: usize) {
        if let Ok(mut set) = self.observed.lock() {
            set.remove(&target);
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Observe(usize),
        Unobserve(usize),
    }

    /// Observer that records calls without computing anything.
    #[derive(Default)]
    pub struct RecordingObserver {
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    impl RecordingObserver {
        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ViewportObserver for RecordingObserver {
        fn observe(&self, target: usize) {
            self.operations.lock().unwrap().push(RecordedOp::Observe(target));
        }

        fn unobserve(&self, target: usize) {
            self.operations.lock().unwrap().push(RecordedOp::Unobserve(target));
        }
    }

    fn entry(target: usize, is_intersecting: bool) -> IntersectionEntry {
        IntersectionEntry {
            target,
            ratio: if is_intersecting { 0.5 } else { 0.0 },
            is_intersecting,
        }
    }

    const KINDS: [SectionKind; 3] = [SectionKind::TrustBar, SectionKind::Section, SectionKind::Section];

    #[test]
    fn classify_by_class_attribute() {
        assert_eq!(SectionKind::from_classes("section section--alt"), Some(SectionKind::Section));
        assert_eq!(SectionKind::from_classes("trust-bar"), Some(SectionKind::TrustBar));
        assert_eq!(SectionKind::from_classes("section trust-bar"), Some(SectionKind::TrustBar));
        assert_eq!(SectionKind::from_classes("section--visible hero"), None);
    }

    #[test]
    fn start_observes_every_section() {
        let observer = RecordingObserver::default();
        let reveal = ScrollReveal::start(&KINDS, false, &observer);
        assert_eq!(
            observer.get_operations(),
            vec![RecordedOp::Observe(0), RecordedOp::Observe(1), RecordedOp::Observe(2)]
        );
        assert!(!reveal.is_visible(0));
        assert_eq!(reveal.visible_class(0), None);
    }

    #[test]
    fn reduced_motion_reveals_everything_without_observing() {
        let observer = RecordingObserver::default();
        let reveal = ScrollReveal::start(&KINDS, true, &observer);
        assert!(observer.get_operations().is_empty());
        assert!(reveal.all_visible());
        assert_eq!(reveal.visible_class(0), Some("trust-bar--visible"));
        assert_eq!(reveal.visible_class(1), Some("section--visible"));
    }

    #[test]
    fn reveal_once_and_unobserve() {
        let observer = RecordingObserver::default();
        let mut reveal = ScrollReveal::start(&KINDS, false, &observer);

        let revealed = reveal.on_intersections(&[entry(1, true), entry(2, false)], &observer);
        assert_eq!(revealed, vec![1]);
        assert_eq!(reveal.visible_class(1), Some("section--visible"));
        assert!(!reveal.is_visible(2));

        // Leaving and re-entering does nothing further.
        assert!(reveal.on_intersections(&[entry(1, false), entry(1, true)], &observer).is_empty());
        assert!(reveal.is_visible(1));
        assert_eq!(
            observer
                .get_operations()
                .iter()
                .filter(|op| **op == RecordedOp::Unobserve(1))
                .count(),
            1
        );
    }

    #[test]
    fn unknown_targets_are_ignored() {
        let observer = RecordingObserver::default();
        let mut reveal = ScrollReveal::start(&KINDS, false, &observer);
        assert!(reveal.on_intersections(&[entry(9, true)], &observer).is_empty());
    }

    #[test]
    fn geometric_threshold_and_bottom_margin() {
        // Viewport 800px tall; effective bottom edge at 760px.
        let rects = vec![
            Rect { top: 0.0, height: 100.0 },
            Rect { top: 750.0, height: 100.0 },
            Rect { top: 700.0, height: 400.0 },
            Rect { top: 2000.0, height: 300.0 },
        ];
        let observer = GeometricObserver::new(ObserverOptions::default(), 800.0, rects);
        let mut reveal = ScrollReveal::start(&[SectionKind::Section; 4], false, &observer);

        let entries = observer.entries_at(0.0);
        let intersecting: Vec<usize> = entries.iter().filter(|e| e.is_intersecting).map(|e| e.target).collect();
        // #1 shows 10px of 100 (exactly the threshold); #2 shows 60px of 400 (0.15).
        assert_eq!(intersecting, vec![0, 1, 2]);

        assert_eq!(reveal.on_intersections(&entries, &observer), vec![0, 1, 2]);
        assert_eq!(observer.observed(), vec![3]);

        let later = observer.entries_at(1500.0);
        assert_eq!(reveal.on_intersections(&later, &observer), vec![3]);
        assert!(reveal.all_visible());
        assert!(observer.observed().is_empty());
    }

    #[test]
    fn geometric_margin_delays_reveal() {
        let rects = vec![Rect { top: 780.0, height: 100.0 }];
        let observer = GeometricObserver::new(ObserverOptions::default(), 800.0, rects);
        let _reveal = ScrollReveal::start(&[SectionKind::Section], false, &observer);
        // 20px inside the viewport, but the margin pulls the edge up to 760.
        assert!(!observer.entries_at(0.0)[0].is_intersecting);
        assert!(observer.entries_at(40.0)[0].is_intersecting);
    }
}
