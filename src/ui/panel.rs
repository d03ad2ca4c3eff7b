//! Immediate-mode floating control panel.
//!
//! The panel is rebuilt every frame: [`ControlPanel::begin`] takes a snapshot
//! of the pointer, each widget call lays itself out below the previous one,
//! handles interaction and records [`Shape`]s, and [`ControlPanel::end`]
//! closes the frame. Nothing touches the GPU until [`ControlPanel::draw`],
//! so layout and interaction are testable headless.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use glam::Vec2;

use super::{Color, Rect};
use crate::assets::{Assets, FontId};
use crate::draw2d::Draw2d;

const ROW_HEIGHT: f32 = 24.0;
const MARGIN: f32 = 15.0;
const PADDING: f32 = 6.0;
const LABEL_FRACTION: f32 = 0.4;
const TEXT_INSET: f32 = 5.0;

/// Folders of the panel, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Folder {
    RealisticRendering,
    PostProcessing,
    Overlay,
}

impl Folder {
    pub const ALL: [Folder; 3] = [
        Folder::RealisticRendering,
        Folder::PostProcessing,
        Folder::Overlay,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Folder::RealisticRendering => "Realistic Rendering",
            Folder::PostProcessing => "Post Processing",
            Folder::Overlay => "Overlay",
        }
    }

    pub fn open_by_default(self) -> bool {
        matches!(self, Folder::Overlay)
    }
}

/// Something that owns tunable parameters and exposes them in one folder.
///
/// `tweak` is called once per frame while the folder is open. It returns true
/// when any of its controls changed the value it is bound to.
pub trait Tweak {
    fn folder(&self) -> Folder;
    fn tweak(&mut self, panel: &mut ControlPanel) -> bool;
}

/// Pointer state the panel reacts to.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PanelInput {
    /// Cursor position in window pixels.
    pub mouse: Vec2,
    /// Primary button held.
    pub down: bool,
    /// Primary button went down this frame.
    pub pressed: bool,
}

/// A recorded draw command.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Rect { rect: Rect, color: Color },
    Text {
        x: f32,
        y: f32,
        text: String,
        color: Color,
    },
}

/// A floating panel of sliders, checkboxes and choosers grouped in folders.
pub struct ControlPanel {
    title: String,
    width: f32,
    visible: bool,
    open: HashMap<Folder, bool>,
    input: PanelInput,
    viewport: Vec2,
    cursor_y: f32,
    next_id: u32,
    active: Option<u32>,
    bounds: Rect,
    shapes: Vec<Shape>,
}

impl ControlPanel {
    pub fn new(title: impl Into<String>, width: f32) -> Self {
        let open = Folder::ALL
            .iter()
            .map(|f| (*f, f.open_by_default()))
            .collect();
        Self {
            title: title.into(),
            width,
            visible: true,
            open,
            input: PanelInput::default(),
            viewport: Vec2::ZERO,
            cursor_y: 0.0,
            next_id: 0,
            active: None,
            bounds: Rect::new(0.0, 0.0, 0.0, 0.0),
            shapes: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.active = None;
        }
    }

    pub fn toggle(&mut self) {
        self.set_visible(!self.visible);
    }

    pub fn is_open(&self, folder: Folder) -> bool {
        self.open.get(&folder).copied().unwrap_or(false)
    }

    /// Screen area covered by the panel in the last finished frame.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// True when the pointer is over the panel or dragging one of its widgets.
    pub fn wants_pointer(&self) -> bool {
        self.visible
            && (self.active.is_some() || self.bounds.contains(self.input.mouse.x, self.input.mouse.y))
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Start a new frame anchored to the top-right corner of the viewport.
    pub fn begin(&mut self, input: PanelInput, viewport: Vec2) {
        self.input = input;
        self.viewport = viewport;
        self.shapes.clear();
        self.next_id = 0;
        self.cursor_y = 0.0;
        if !input.down {
            self.active = None;
        }
        if !self.visible {
            return;
        }

        let title_row = self.row();
        self.push_rect(title_row, Color::PANEL_HEADER);
        let title = self.title.clone();
        self.push_text(title_row.x + TEXT_INSET, title_row.y + TEXT_INSET, title);
    }

    /// Finish the frame and record the panel bounds.
    pub fn end(&mut self) {
        if !self.visible {
            self.bounds = Rect::new(0.0, 0.0, 0.0, 0.0);
            return;
        }
        let x = self.left();
        self.bounds = Rect::new(x, 0.0, self.width, self.cursor_y);
        // Body background goes underneath everything recorded this frame.
        self.shapes.insert(
            0,
            Shape::Rect {
                rect: self.bounds,
                color: Color::PANEL_BG,
            },
        );
    }

    /// Folder header. Clicking it toggles the folder; returns whether it is open.
    pub fn folder(&mut self, folder: Folder) -> bool {
        if !self.visible {
            return false;
        }
        let row = self.row();
        if self.clicked(row) {
            let open = !self.is_open(folder);
            self.open.insert(folder, open);
        }
        let open = self.is_open(folder);
        self.push_rect(row, Color::PANEL_HEADER);
        let marker = if open { "v" } else { ">" };
        self.push_text(
            row.x + TEXT_INSET,
            row.y + TEXT_INSET,
            format!("{marker} {}", folder.title()),
        );
        open
    }

    /// Float slider. Click or drag the track to set the value; it snaps to `step`.
    pub fn slider(
        &mut self,
        label: &str,
        value: &mut f32,
        range: RangeInclusive<f32>,
        step: f32,
    ) -> bool {
        let id = self.id();
        if !self.visible {
            return false;
        }
        let row = self.row();
        let track = self.control_area(row);
        let (min, max) = (*range.start(), *range.end());

        if self.clicked(track) {
            self.active = Some(id);
        }
        let mut changed = false;
        if self.active == Some(id) && self.input.down && max > min {
            let t = ((self.input.mouse.x - track.x) / track.width).clamp(0.0, 1.0);
            let next = snap(min + t * (max - min), min, max, step);
            if next != *value {
                *value = next;
                changed = true;
            }
        }

        let t = if max > min {
            ((*value - min) / (max - min)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.push_label(row, label);
        self.push_rect(track, Color::PANEL_WELL);
        self.push_rect(
            Rect::new(track.x, track.y, track.width * t, track.height),
            Color::PANEL_ACCENT,
        );
        self.push_text(
            track.x + TEXT_INSET,
            row.y + TEXT_INSET,
            format!("{:.*}", decimals(step), *value),
        );
        changed
    }

    /// Boolean toggle. Clicking anywhere on the row flips it.
    pub fn checkbox(&mut self, label: &str, value: &mut bool) -> bool {
        let _ = self.id();
        if !self.visible {
            return false;
        }
        let row = self.row();
        let changed = self.clicked(row);
        if changed {
            *value = !*value;
        }

        let area = self.control_area(row);
        let size = area.height;
        let boxed = Rect::new(area.x, area.y, size, size);
        self.push_label(row, label);
        self.push_rect(boxed, Color::PANEL_WELL);
        if *value {
            self.push_rect(
                Rect::new(boxed.x + 4.0, boxed.y + 4.0, size - 8.0, size - 8.0),
                Color::PANEL_ACCENT,
            );
        }
        changed
    }

    /// Enum chooser. Clicking the control advances to the next option.
    pub fn choice<T: Copy + PartialEq>(
        &mut self,
        label: &str,
        value: &mut T,
        options: &[(T, &str)],
    ) -> bool {
        let _ = self.id();
        if !self.visible || options.is_empty() {
            return false;
        }
        let row = self.row();
        let area = self.control_area(row);
        let current = options.iter().position(|(v, _)| *v == *value);

        let mut changed = false;
        if self.clicked(area) {
            let next = current.map_or(0, |i| (i + 1) % options.len());
            if Some(next) != current {
                *value = options[next].0;
                changed = true;
            }
        }

        let name = options
            .iter()
            .find(|(v, _)| *v == *value)
            .map_or("?", |(_, name)| *name)
            .to_string();
        self.push_label(row, label);
        self.push_rect(area, Color::PANEL_WELL);
        self.push_text(area.x + TEXT_INSET, row.y + TEXT_INSET, name);
        changed
    }

    /// Replay the recorded shapes into the 2D batcher.
    ///
    /// Text is skipped when no font is available; widgets still render.
    pub fn draw(&self, draw: &mut Draw2d, assets: &Assets, font: Option<FontId>) {
        for shape in &self.shapes {
            match shape {
                Shape::Rect { rect, color } => {
                    draw.rect(rect.x, rect.y, rect.width, rect.height, *color);
                }
                Shape::Text { x, y, text, color } => {
                    if let Some(font) = font {
                        draw.text(assets, font, *x, *y, text, *color);
                    }
                }
            }
        }
    }

    fn left(&self) -> f32 {
        (self.viewport.x - self.width - MARGIN).max(0.0)
    }

    fn row(&mut self) -> Rect {
        let row = Rect::new(self.left(), self.cursor_y, self.width, ROW_HEIGHT);
        self.cursor_y += ROW_HEIGHT;
        row
    }

    fn control_area(&self, row: Rect) -> Rect {
        let x = row.x + row.width * LABEL_FRACTION;
        Rect::new(
            x,
            row.y + 3.0,
            row.right() - x - PADDING,
            row.height - 6.0,
        )
    }

    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn clicked(&self, area: Rect) -> bool {
        self.input.pressed && area.contains(self.input.mouse.x, self.input.mouse.y)
    }

    fn push_rect(&mut self, rect: Rect, color: Color) {
        self.shapes.push(Shape::Rect { rect, color });
    }

    fn push_text(&mut self, x: f32, y: f32, text: String) {
        self.shapes.push(Shape::Text {
            x,
            y,
            text,
            color: Color::PANEL_TEXT,
        });
    }

    fn push_label(&mut self, row: Rect, label: &str) {
        self.push_text(row.x + TEXT_INSET, row.y + TEXT_INSET, label.to_string());
    }
}

fn snap(value: f32, min: f32, max: f32, step: f32) -> f32 {
    let snapped = if step > 0.0 {
        min + ((value - min) / step).round() * step
    } else {
        value
    };
    snapped.clamp(min, max)
}

fn decimals(step: f32) -> usize {
    if step <= 0.0 || step >= 1.0 {
        0
    } else {
        (-step.log10()).ceil().clamp(0.0, 4.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);

    fn idle() -> PanelInput {
        PanelInput::default()
    }

    fn press(x: f32, y: f32) -> PanelInput {
        PanelInput {
            mouse: Vec2::new(x, y),
            down: true,
            pressed: true,
        }
    }

    fn drag(x: f32, y: f32) -> PanelInput {
        PanelInput {
            mouse: Vec2::new(x, y),
            down: true,
            pressed: false,
        }
    }

    fn panel() -> ControlPanel {
        ControlPanel::new("Tweak It", 340.0)
    }

    // Panel spans x = 925..1265. Row 0 is the title; folders follow.
    const LEFT: f32 = 1280.0 - 340.0 - 15.0;
    const TRACK_X: f32 = LEFT + 340.0 * 0.4;

    #[test]
    fn folders_start_with_only_overlay_open() {
        let p = panel();
        assert!(!p.is_open(Folder::RealisticRendering));
        assert!(!p.is_open(Folder::PostProcessing));
        assert!(p.is_open(Folder::Overlay));
    }

    #[test]
    fn clicking_a_header_toggles_its_folder() {
        let mut p = panel();
        p.begin(press(LEFT + 10.0, 24.0 + 5.0), VIEWPORT);
        assert!(p.folder(Folder::RealisticRendering));
        p.end();

        p.begin(idle(), VIEWPORT);
        assert!(p.folder(Folder::RealisticRendering));
        p.end();
    }

    #[test]
    fn slider_click_sets_snapped_value() {
        let mut p = panel();
        let mut alpha = 1.0;
        let track_w = 340.0 - 340.0 * 0.4 - PADDING;

        // Overlay folder (row 1) is open, slider is row 2.
        p.begin(press(TRACK_X + track_w * 0.333, 48.0 + 10.0), VIEWPORT);
        p.folder(Folder::Overlay);
        let changed = p.slider("overlayAlpha", &mut alpha, 0.0..=1.0, 0.01);
        p.end();

        assert!(changed);
        assert!((alpha - 0.33).abs() < 1e-6);
    }

    #[test]
    fn slider_drag_continues_outside_the_row() {
        let mut p = panel();
        let mut v = 0.0;
        p.begin(press(TRACK_X + 1.0, 48.0 + 10.0), VIEWPORT);
        p.folder(Folder::Overlay);
        p.slider("v", &mut v, 0.0..=10.0, 0.1);
        p.end();

        p.begin(drag(2000.0, 500.0), VIEWPORT);
        p.folder(Folder::Overlay);
        assert!(p.slider("v", &mut v, 0.0..=10.0, 0.1));
        p.end();
        assert_eq!(v, 10.0);
        assert!(p.wants_pointer());

        p.begin(idle(), VIEWPORT);
        p.end();
        assert!(!p.wants_pointer());
    }

    #[test]
    fn checkbox_toggles_on_click() {
        let mut p = panel();
        let mut enabled = false;
        p.begin(press(LEFT + 5.0, 48.0 + 5.0), VIEWPORT);
        p.folder(Folder::Overlay);
        assert!(p.checkbox("enabled", &mut enabled));
        p.end();
        assert!(enabled);
    }

    #[test]
    fn choice_cycles_options() {
        #[derive(Clone, Copy, PartialEq, Debug)]
        enum Mode {
            A,
            B,
        }
        let options = [(Mode::A, "A"), (Mode::B, "B")];
        let mut mode = Mode::B;
        let mut p = panel();
        p.begin(press(TRACK_X + 5.0, 48.0 + 10.0), VIEWPORT);
        p.folder(Folder::Overlay);
        assert!(p.choice("mode", &mut mode, &options));
        p.end();
        assert_eq!(mode, Mode::A);
    }

    #[test]
    fn hidden_panel_records_nothing() {
        let mut p = panel();
        p.toggle();
        let mut v = 0.5;
        p.begin(press(TRACK_X + 5.0, 48.0 + 10.0), VIEWPORT);
        assert!(!p.folder(Folder::Overlay));
        assert!(!p.slider("v", &mut v, 0.0..=1.0, 0.01));
        p.end();
        assert!(p.shapes().is_empty());
        assert_eq!(v, 0.5);
        assert!(!p.wants_pointer());
    }

    #[test]
    fn bounds_cover_every_row() {
        let mut p = panel();
        p.begin(idle(), VIEWPORT);
        for folder in Folder::ALL {
            p.folder(folder);
        }
        p.end();
        assert_eq!(p.bounds(), Rect::new(LEFT, 0.0, 340.0, 4.0 * ROW_HEIGHT));
        assert!(matches!(p.shapes()[0], Shape::Rect { color, .. } if color == Color::PANEL_BG));
    }

    #[test]
    fn value_text_uses_step_precision() {
        assert_eq!(decimals(0.01), 2);
        assert_eq!(decimals(0.001), 3);
        assert_eq!(decimals(1.0), 0);
        assert_eq!(snap(0.456, 0.0, 1.0, 0.1), 0.5);
        assert_eq!(snap(7.0, -1.0, 1.0, 0.001), 1.0);
    }
}
