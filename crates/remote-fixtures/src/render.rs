//! Rendered-text extraction.
//!
//! Lists, combo boxes and trees do not store the text they show: a cell
//! renderer produces a transient component per item and paints it. To read
//! that text the extractor asks the renderer for the component, gives it a
//! paintable size, and records every string it would draw. The whole
//! operation is one unit of work on the UI owner thread.
//!
//! ```
//! use remote_fixtures::render::{
//!     extract_rendered_text, CellHost, CellResult, CellState, FnRenderer, Label, ListSource,
//! };
//!
//! let source = ListSource::new(
//!     "fruits",
//!     vec!["Alpha", "Beta"],
//!     FnRenderer::new(|_: &CellHost, item: &&str, cell: CellState| -> CellResult {
//!         Ok(Box::new(Label::new(format!("{item} [{}]", cell.index))))
//!     }),
//! );
//! let text = extract_rendered_text(&source, CellState::new(0), 100).unwrap();
//! assert_eq!(text, "Alpha [0]");
//! ```

use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

use crate::result::{FixtureError, FixtureResult, RenderError};
use crate::transport::ComponentId;
use crate::ui_thread::{panic_message, UiThread};

/// Height given to a cell component that was never laid out
pub const DEFAULT_FALLBACK_HEIGHT: u32 = 100;

/// Width used when the source reports none
pub const DEFAULT_FALLBACK_WIDTH: u32 = 200;

/// Component size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Size {
    /// Create a size
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Zero-area sizes cannot be painted
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Cell being rendered: model index plus rendering flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellState {
    /// Model index
    pub index: usize,
    /// Render as selected
    pub selected: bool,
    /// Render as focused
    pub focused: bool,
}

impl CellState {
    /// Unselected, unfocused cell
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            selected: false,
            focused: false,
        }
    }

    /// Set the selection flag
    #[must_use]
    pub const fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Set the focus flag
    #[must_use]
    pub const fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

/// One render extraction, addressed to a remote renderer source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Renderer source component
    pub source: ComponentId,
    /// Cell to render
    pub cell: CellState,
}

impl RenderRequest {
    /// Request an unselected, unfocused cell
    #[must_use]
    pub const fn new(source: ComponentId, index: usize) -> Self {
        Self {
            source,
            cell: CellState::new(index),
        }
    }

    /// Set the selection flag
    #[must_use]
    pub const fn selected(mut self, selected: bool) -> Self {
        self.cell.selected = selected;
        self
    }

    /// Set the focus flag
    #[must_use]
    pub const fn focused(mut self, focused: bool) -> Self {
        self.cell.focused = focused;
        self
    }
}

// =============================================================================
// PAINTING
// =============================================================================

/// What a cell renderer hands back
pub type CellResult = Result<Box<dyn RenderComponent>, RenderError>;

/// Receiver of paint calls
pub trait Painter {
    /// Draw a run of text
    fn draw_text(&mut self, text: &str);
}

/// A component a cell renderer produces
pub trait RenderComponent {
    /// Current size
    fn size(&self) -> Size;

    /// Resize; composite components lay out their children
    fn set_size(&mut self, size: Size);

    /// Paint this component's own content (not its children)
    fn paint(&self, painter: &mut dyn Painter) -> Result<(), RenderError>;

    /// Sub-components, in paint order
    fn children(&self) -> Vec<&dyn RenderComponent> {
        Vec::new()
    }
}

/// Single run of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    text: String,
    size: Size,
}

impl Label {
    /// Unsized label
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: Size::default(),
        }
    }

    /// Label text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl RenderComponent for Label {
    fn size(&self) -> Size {
        self.size
    }

    fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    fn paint(&self, painter: &mut dyn Painter) -> Result<(), RenderError> {
        painter.draw_text(&self.text);
        Ok(())
    }
}

/// Composite component stacking its children
#[derive(Default)]
pub struct Panel {
    children: Vec<Box<dyn RenderComponent>>,
    size: Size,
}

impl std::fmt::Debug for Panel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Panel")
            .field("children", &self.children.len())
            .field("size", &self.size)
            .finish()
    }
}

impl Panel {
    /// Empty panel
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child
    #[must_use]
    pub fn with(mut self, child: impl RenderComponent + 'static) -> Self {
        self.children.push(Box::new(child));
        self
    }
}

impl RenderComponent for Panel {
    fn size(&self) -> Size {
        self.size
    }

    fn set_size(&mut self, size: Size) {
        self.size = size;
        for child in &mut self.children {
            child.set_size(size);
        }
    }

    fn paint(&self, _painter: &mut dyn Painter) -> Result<(), RenderError> {
        Ok(())
    }

    fn children(&self) -> Vec<&dyn RenderComponent> {
        self.children.iter().map(AsRef::as_ref).collect()
    }
}

// =============================================================================
// CELL RENDERERS
// =============================================================================

/// Throwaway host handed to cell renderers.
///
/// It stands in for the list a renderer normally draws into; it is never
/// part of a visible hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellHost {
    width: u32,
    attached: bool,
}

impl CellHost {
    /// Unparented host of the given width
    #[must_use]
    pub const fn detached(width: u32) -> Self {
        Self {
            width,
            attached: false,
        }
    }

    /// Host width
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Always false for extraction hosts
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.attached
    }
}

/// Factory producing the component that paints one cell
pub trait CellRenderer<T> {
    /// Produce the component for `value`
    fn component_for(
        &self,
        host: &CellHost,
        value: &T,
        cell: CellState,
    ) -> CellResult;
}

/// Closure-backed cell renderer
pub struct FnRenderer<F>(F);

impl<F> FnRenderer<F> {
    /// Wrap a closure
    pub const fn new(render: F) -> Self {
        Self(render)
    }
}

impl<F> std::fmt::Debug for FnRenderer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRenderer").finish_non_exhaustive()
    }
}

impl<T, F> CellRenderer<T> for FnRenderer<F>
where
    F: Fn(&CellHost, &T, CellState) -> CellResult,
{
    fn component_for(
        &self,
        host: &CellHost,
        value: &T,
        cell: CellState,
    ) -> CellResult {
        (self.0)(host, value, cell)
    }
}

/// A component that renders its items through a cell renderer
pub trait RendererSource {
    /// Name used in diagnostics
    fn describe(&self) -> String;

    /// Width of the source component
    fn width(&self) -> u32;

    /// Number of items in the backing model
    fn item_count(&self) -> usize;

    /// Produce the transient component for one cell
    fn render_cell(
        &self,
        host: &CellHost,
        cell: CellState,
    ) -> CellResult;
}

/// List-like renderer source: a model plus its current cell renderer
pub struct ListSource<T> {
    name: String,
    items: Vec<T>,
    renderer: Box<dyn CellRenderer<T>>,
    width: u32,
}

impl<T> std::fmt::Debug for ListSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListSource")
            .field("name", &self.name)
            .field("items", &self.items.len())
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

impl<T> ListSource<T> {
    /// Create a source with the default width
    pub fn new(
        name: impl Into<String>,
        items: Vec<T>,
        renderer: impl CellRenderer<T> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            items,
            renderer: Box::new(renderer),
            width: DEFAULT_FALLBACK_WIDTH,
        }
    }

    /// Set the component width
    #[must_use]
    pub const fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Backing model
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Mutable backing model
    pub fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }

    /// Replace the cell renderer
    pub fn set_renderer(&mut self, renderer: impl CellRenderer<T> + 'static) {
        self.renderer = Box::new(renderer);
    }
}

impl<T> RendererSource for ListSource<T> {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn render_cell(
        &self,
        host: &CellHost,
        cell: CellState,
    ) -> CellResult {
        let item = self
            .items
            .get(cell.index)
            .ok_or(RenderError::IndexOutOfRange {
                index: cell.index,
                len: self.items.len(),
            })?;
        self.renderer.component_for(host, item, cell)
    }
}

// =============================================================================
// TEXT HARVESTING
// =============================================================================

/// Recursive visitor collecting the text a component would paint
#[derive(Debug, Default)]
pub struct TextHarvester {
    pieces: Vec<String>,
}

impl TextHarvester {
    /// Empty harvester
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Paint `component` and its sub-components into this harvester.
    ///
    /// Zero-area components paint nothing, as in a real toolkit.
    pub fn harvest(&mut self, component: &dyn RenderComponent) -> Result<(), RenderError> {
        if component.size().is_empty() {
            return Ok(());
        }
        component.paint(self)?;
        for child in component.children() {
            self.harvest(child)?;
        }
        Ok(())
    }

    /// Pieces collected so far, in paint order
    #[must_use]
    pub fn pieces(&self) -> &[String] {
        &self.pieces
    }

    /// Pieces joined by single spaces
    #[must_use]
    pub fn text(&self) -> String {
        self.pieces.join(" ")
    }
}

impl Painter for TextHarvester {
    fn draw_text(&mut self, text: &str) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.pieces.push(trimmed.to_string());
        }
    }
}

/// Extract the text one cell renders.
///
/// Must run on the thread owning `source`; `RenderExtractor` arranges that.
pub fn extract_rendered_text(
    source: &dyn RendererSource,
    cell: CellState,
    fallback_height: u32,
) -> Result<String, RenderError> {
    let width = match source.width() {
        0 => DEFAULT_FALLBACK_WIDTH,
        w => w,
    };
    let host = CellHost::detached(width);
    let mut component = source.render_cell(&host, cell)?;
    component.set_size(Size::new(width, fallback_height.max(1)));

    let mut harvester = TextHarvester::new();
    harvester.harvest(component.as_ref())?;
    Ok(harvester.text())
}

// =============================================================================
// EXTRACTOR
// =============================================================================

/// UI state that can hand out renderer sources by component id
pub trait RendererLookup {
    /// Find the renderer source for `id`
    fn renderer_source(&self, id: ComponentId) -> Result<&dyn RendererSource, RenderError>;

    /// Name of `id` for diagnostics
    fn describe_component(&self, id: ComponentId) -> String {
        id.to_string()
    }
}

/// Runs render extractions on the UI owner thread
pub struct RenderExtractor<S> {
    ui: UiThread<S>,
    fallback_height: u32,
}

impl<S> Clone for RenderExtractor<S> {
    fn clone(&self) -> Self {
        Self {
            ui: self.ui.clone(),
            fallback_height: self.fallback_height,
        }
    }
}

impl<S> std::fmt::Debug for RenderExtractor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderExtractor")
            .field("ui", &self.ui)
            .field("fallback_height", &self.fallback_height)
            .finish()
    }
}

impl<S: RendererLookup + 'static> RenderExtractor<S> {
    /// Extractor bound to a UI owner thread
    #[must_use]
    pub const fn new(ui: UiThread<S>) -> Self {
        Self {
            ui,
            fallback_height: DEFAULT_FALLBACK_HEIGHT,
        }
    }

    /// Height forced onto cell components
    #[must_use]
    pub const fn with_fallback_height(mut self, height: u32) -> Self {
        self.fallback_height = height;
        self
    }

    /// Extract the text rendered for `request`.
    ///
    /// The lookup, render, resize and harvest all happen in a single unit of
    /// work on the owner thread. Any failure, including a panicking renderer,
    /// comes back as `FixtureError::RenderExtraction`.
    pub fn extract(&self, request: &RenderRequest) -> FixtureResult<String> {
        let request = request.clone();
        let height = self.fallback_height;
        self.ui.run_sync(move |state| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let source = state.renderer_source(request.source)?;
                extract_rendered_text(source, request.cell, height)
            }));
            let result = outcome.unwrap_or_else(|payload| {
                Err(RenderError::Panicked {
                    message: panic_message(payload.as_ref()),
                })
            });
            match result {
                Ok(text) => {
                    debug!(source = %request.source, index = request.cell.index, %text, "extracted rendered text");
                    Ok(text)
                }
                Err(source) => Err(FixtureError::RenderExtraction {
                    component: state.describe_component(request.source),
                    index: request.cell.index,
                    source,
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn bracketed() -> FnRenderer<impl Fn(&CellHost, &&'static str, CellState) -> CellResult> {
        FnRenderer::new(
            |_: &CellHost, item: &&'static str, cell: CellState| -> CellResult {
                Ok(Box::new(Label::new(format!("{item} [{}]", cell.index))))
            },
        )
    }

    fn fruits() -> ListSource<&'static str> {
        ListSource::new("fruits", vec!["Alpha", "Beta"], bracketed())
    }

    mod harvester_tests {
        use super::*;

        #[test]
        fn test_trims_and_skips_blank_pieces() {
            let mut panel = Panel::new()
                .with(Label::new("  Alpha  "))
                .with(Label::new("   "))
                .with(Label::new("\tBeta\n"));
            panel.set_size(Size::new(10, 10));
            let mut harvester = TextHarvester::new();
            harvester.harvest(&panel).unwrap();
            assert_eq!(harvester.pieces(), ["Alpha", "Beta"]);
            assert_eq!(harvester.text(), "Alpha Beta");
        }

        #[test]
        fn test_unsized_component_paints_nothing() {
            let label = Label::new("hidden");
            let mut harvester = TextHarvester::new();
            harvester.harvest(&label).unwrap();
            assert!(harvester.pieces().is_empty());
        }

        #[test]
        fn test_nested_panels_in_paint_order() {
            let mut panel = Panel::new()
                .with(Label::new("a"))
                .with(Panel::new().with(Label::new("b")).with(Label::new("c")))
                .with(Label::new("d"));
            panel.set_size(Size::new(1, 1));
            let mut harvester = TextHarvester::new();
            harvester.harvest(&panel).unwrap();
            assert_eq!(harvester.text(), "a b c d");
        }

        #[test]
        fn test_paint_error_propagates() {
            struct Broken(Size);
            impl RenderComponent for Broken {
                fn size(&self) -> Size {
                    self.0
                }
                fn set_size(&mut self, size: Size) {
                    self.0 = size;
                }
                fn paint(&self, _: &mut dyn Painter) -> Result<(), RenderError> {
                    Err(RenderError::failed("no font"))
                }
            }
            let mut harvester = TextHarvester::new();
            let err = harvester.harvest(&Broken(Size::new(1, 1))).unwrap_err();
            assert_eq!(err, RenderError::failed("no font"));
        }
    }

    mod extraction_tests {
        use super::*;

        #[test]
        fn test_item_with_bracketed_index() {
            let text = extract_rendered_text(&fruits(), CellState::new(0), 100).unwrap();
            assert_eq!(text, "Alpha [0]");
            let text = extract_rendered_text(&fruits(), CellState::new(1), 100).unwrap();
            assert_eq!(text, "Beta [1]");
        }

        #[test]
        fn test_composite_renderer_joined_with_spaces() {
            let source = ListSource::new(
                "composite",
                vec![("Alpha", 3_u32)],
                FnRenderer::new(|_: &CellHost, item: &(&str, u32), _: CellState| -> CellResult {
                    let panel = Panel::new()
                        .with(Label::new(item.0))
                        .with(Label::new(format!(" ({}) ", item.1)));
                    Ok(Box::new(panel))
                }),
            );
            let text = extract_rendered_text(&source, CellState::new(0), 20).unwrap();
            assert_eq!(text, "Alpha (3)");
        }

        #[test]
        fn test_out_of_range_index_is_error() {
            let err = extract_rendered_text(&fruits(), CellState::new(2), 100).unwrap_err();
            assert_eq!(err, RenderError::IndexOutOfRange { index: 2, len: 2 });
        }

        #[test]
        fn test_renderer_receives_flags_and_detached_host() {
            let source = ListSource::new(
                "flags",
                vec![()],
                FnRenderer::new(|host: &CellHost, _: &(), cell: CellState| -> CellResult {
                    assert!(!host.is_attached());
                    assert_eq!(host.width(), 321);
                    let label = format!("selected={} focused={}", cell.selected, cell.focused);
                    Ok(Box::new(Label::new(label)))
                }),
            )
            .with_width(321);
            let text =
                extract_rendered_text(&source, CellState::new(0).selected(true), 100).unwrap();
            assert_eq!(text, "selected=true focused=false");
        }

        #[test]
        fn test_zero_width_source_gets_fallback_width() {
            let source = fruits().with_width(0);
            let text = extract_rendered_text(&source, CellState::new(1), 0).unwrap();
            assert_eq!(text, "Beta [1]");
        }

        #[test]
        fn test_renderer_error_propagates() {
            let source = ListSource::new(
                "failing",
                vec![1],
                FnRenderer::new(|_: &CellHost, _: &i32, _: CellState| -> CellResult {
                    Err(RenderError::failed("renderer not installed"))
                }),
            );
            let err = extract_rendered_text(&source, CellState::new(0), 100).unwrap_err();
            assert!(matches!(err, RenderError::RendererFailed { .. }));
        }

        #[test]
        fn test_deterministic_for_fixed_snapshot() {
            let source = fruits();
            let first = extract_rendered_text(&source, CellState::new(1), 100).unwrap();
            for _ in 0..10 {
                assert_eq!(
                    extract_rendered_text(&source, CellState::new(1), 100).unwrap(),
                    first
                );
            }
        }

        #[test]
        fn test_list_source_accessors() {
            let mut source = fruits();
            assert_eq!(source.item_count(), 2);
            source.items_mut().push("Gamma");
            assert_eq!(source.items(), ["Alpha", "Beta", "Gamma"]);
            source.set_renderer(FnRenderer::new(
                |_: &CellHost, item: &&'static str, _: CellState| -> CellResult {
                    Ok(Box::new(Label::new(item.to_uppercase())))
                },
            ));
            let text = extract_rendered_text(&source, CellState::new(2), 100).unwrap();
            assert_eq!(text, "GAMMA");
        }
    }

    mod extractor_tests {
        use super::*;

        struct Sources {
            lists: HashMap<ComponentId, ListSource<&'static str>>,
            buttons: Vec<ComponentId>,
        }

        impl RendererLookup for Sources {
            fn renderer_source(&self, id: ComponentId) -> Result<&dyn RendererSource, RenderError> {
                if let Some(list) = self.lists.get(&id) {
                    return Ok(list);
                }
                if self.buttons.contains(&id) {
                    return Err(RenderError::NotARendererSource);
                }
                Err(RenderError::SourceNotFound)
            }

            fn describe_component(&self, id: ComponentId) -> String {
                self.lists
                    .get(&id)
                    .map_or_else(|| id.to_string(), |l| format!("{}{id}", l.describe()))
            }
        }

        fn extractor() -> RenderExtractor<Sources> {
            let ui = UiThread::spawn("render-test", || {
                let mut lists = HashMap::new();
                lists.insert(ComponentId(1), fruits());
                lists.insert(
                    ComponentId(2),
                    ListSource::new(
                        "panicking",
                        vec!["x"],
                        FnRenderer::new(|_: &CellHost, _: &&'static str, _: CellState| -> CellResult {
                            panic!("renderer blew up")
                        }),
                    ),
                );
                Sources {
                    lists,
                    buttons: vec![ComponentId(9)],
                }
            })
            .unwrap();
            RenderExtractor::new(ui)
        }

        #[test]
        fn test_extract_on_owner_thread() {
            let text = extractor()
                .extract(&RenderRequest::new(ComponentId(1), 0))
                .unwrap();
            assert_eq!(text, "Alpha [0]");
        }

        #[test]
        fn test_out_of_range_identifies_source_and_index() {
            let err = extractor()
                .extract(&RenderRequest::new(ComponentId(1), 5))
                .unwrap_err();
            match err {
                FixtureError::RenderExtraction {
                    component,
                    index,
                    source,
                } => {
                    assert_eq!(component, "fruits#1");
                    assert_eq!(index, 5);
                    assert_eq!(source, RenderError::IndexOutOfRange { index: 5, len: 2 });
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_panicking_renderer_becomes_extraction_error() {
            let extractor = extractor();
            let err = extractor
                .extract(&RenderRequest::new(ComponentId(2), 0))
                .unwrap_err();
            match err {
                FixtureError::RenderExtraction { source, .. } => {
                    assert!(matches!(source, RenderError::Panicked { ref message } if message.contains("blew up")));
                }
                other => panic!("unexpected {other:?}"),
            }
            // Owner thread keeps serving.
            assert!(extractor
                .extract(&RenderRequest::new(ComponentId(1), 1))
                .is_ok());
        }

        #[test]
        fn test_missing_and_wrong_kind_sources() {
            let extractor = extractor();
            let missing = extractor
                .extract(&RenderRequest::new(ComponentId(404), 0))
                .unwrap_err();
            assert!(matches!(
                missing,
                FixtureError::RenderExtraction {
                    source: RenderError::SourceNotFound,
                    ..
                }
            ));
            let button = extractor
                .extract(&RenderRequest::new(ComponentId(9), 0))
                .unwrap_err();
            assert!(matches!(
                button,
                FixtureError::RenderExtraction {
                    source: RenderError::NotARendererSource,
                    ..
                }
            ));
        }

        #[test]
        fn test_request_builder_flags() {
            let request = RenderRequest::new(ComponentId(3), 4)
                .selected(true)
                .focused(true);
            assert_eq!(request.cell.index, 4);
            assert!(request.cell.selected);
            assert!(request.cell.focused);
        }
    }
}
