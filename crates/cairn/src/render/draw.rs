//! The draw pass: measured rows in, one closed outline path out.
//!
//! The outline is emitted clockwise from the top-left corner. The top edge
//! dispatches on the hat tag, statement rows carve the C-shape wrap, and
//! value blocks draw the silhouette of their output shape.

use svg::node::element::path::Data;

use cairn_model::{HatKind, OutputShape};

use crate::render::{
    constants::ConstantProvider,
    measure::{ConnectionPosition, RenderInfo, Row, RowKind},
};

/// A drawn block outline plus its attachable points.
#[derive(Debug, Clone)]
pub struct Outline {
    pub data: Data,
    pub connections: Vec<ConnectionPosition>,
}

/// Emits outline path data for measured blocks.
pub struct Drawer<'a> {
    constants: &'a ConstantProvider,
}

impl<'a> Drawer<'a> {
    pub fn new(constants: &'a ConstantProvider) -> Self {
        Self { constants }
    }

    pub fn draw(&self, info: &RenderInfo) -> Outline {
        let data = match info.output_shape() {
            Some(shape) => self.value_outline(info, shape),
            None => self.stack_outline(info),
        };
        Outline {
            data,
            connections: info.connections().to_vec(),
        }
    }

    fn value_outline(&self, info: &RenderInfo, shape: OutputShape) -> Data {
        let width = info.size().width();
        let height = info.size().height();
        match shape {
            OutputShape::Round => {
                // Pill: semicircular caps on both ends.
                let radius = height / 2.0;
                Data::new()
                    .move_to((radius, 0.0))
                    .line_to((width - radius, 0.0))
                    .elliptical_arc_to((radius, radius, 0.0, 0.0, 1.0, width - radius, height))
                    .line_to((radius, height))
                    .elliptical_arc_to((radius, radius, 0.0, 0.0, 1.0, radius, 0.0))
                    .close()
            }
            OutputShape::Hexagonal => {
                let point = height / 2.0;
                Data::new()
                    .move_to((point, 0.0))
                    .line_to((width - point, 0.0))
                    .line_to((width, point))
                    .line_to((width - point, height))
                    .line_to((point, height))
                    .line_to((0.0, point))
                    .close()
            }
            OutputShape::Square => {
                let radius = self.constants.corner_radius();
                Data::new()
                    .move_to((radius, 0.0))
                    .line_to((width - radius, 0.0))
                    .elliptical_arc_to((radius, radius, 0.0, 0.0, 1.0, width, radius))
                    .line_to((width, height - radius))
                    .elliptical_arc_to((radius, radius, 0.0, 0.0, 1.0, width - radius, height))
                    .line_to((radius, height))
                    .elliptical_arc_to((radius, radius, 0.0, 0.0, 1.0, 0.0, height - radius))
                    .line_to((0.0, radius))
                    .elliptical_arc_to((radius, radius, 0.0, 0.0, 1.0, radius, 0.0))
                    .close()
            }
        }
    }

    fn stack_outline(&self, info: &RenderInfo) -> Data {
        let width = info.size().width();
        let height = info.size().height();
        let radius = self.constants.corner_radius();
        let indent = self.constants.statement_indent(info.hat());

        let data = self.top_edge(info, width);
        let data = self.right_edge(info, data, width, indent);
        let data = self.bottom_edge(info, data, width, height, radius);
        data.close()
    }

    /// Top-left corner through to the top-right corner.
    fn top_edge(&self, info: &RenderInfo, width: f32) -> Data {
        let radius = self.constants.corner_radius();
        match info.hat() {
            HatKind::None => {
                let data = Data::new()
                    .move_to((0.0, radius))
                    .elliptical_arc_to((radius, radius, 0.0, 0.0, 1.0, radius, 0.0));
                let data = if info.has_previous() {
                    self.notch_right(data, self.constants.notch_offset(), 0.0)
                } else {
                    data
                };
                data.line_to((width - radius, 0.0)).elliptical_arc_to((
                    radius, radius, 0.0, 0.0, 1.0, width, radius,
                ))
            }
            HatKind::Cap => {
                // The fixed-width event cap curve; the body edge picks up at
                // the cap's baseline.
                let cap_width = self.constants.cap_hat_width();
                let cap_height = self.constants.cap_hat_height();
                Data::new()
                    .move_to((0.0, cap_height))
                    .cubic_curve_to((
                        cap_width * 0.26,
                        -cap_height * 0.38,
                        cap_width * 0.74,
                        -cap_height * 0.38,
                        cap_width,
                        cap_height,
                    ))
                    .line_to((width - radius, cap_height))
                    .elliptical_arc_to((
                        radius,
                        radius,
                        0.0,
                        0.0,
                        1.0,
                        width,
                        cap_height + radius,
                    ))
            }
            HatKind::Bowler => {
                // A rounded top spanning the block's full width.
                let rise = self.constants.bowler_hat_height();
                Data::new()
                    .move_to((0.0, rise))
                    .elliptical_arc_to((rise, rise, 0.0, 0.0, 1.0, rise, 0.0))
                    .line_to((width - rise, 0.0))
                    .elliptical_arc_to((rise, rise, 0.0, 0.0, 1.0, width, rise))
            }
        }
    }

    /// Right edge, carving the C-shape wrap for every statement row.
    ///
    /// Bowler blocks span their full width and wrap substacks flush against
    /// a straight right edge, so nothing is carved for them.
    fn right_edge(&self, info: &RenderInfo, mut data: Data, width: f32, indent: f32) -> Data {
        if info.hat() == HatKind::Bowler {
            return data;
        }
        for row in info.rows() {
            if row.kind != RowKind::Statement {
                continue;
            }
            data = self.statement_cut(data, row, width, indent);
        }
        data
    }

    fn statement_cut(&self, data: Data, row: &Row, width: f32, indent: f32) -> Data {
        let arm = indent + self.constants.corner_radius();
        let data = data
            .line_to((width, row.y))
            .line_to((arm + self.constants.notch_width(), row.y));
        let data = self.notch_left(data, arm + self.constants.notch_width(), row.y);
        data.line_to((arm, row.y))
            .line_to((arm, row.y + row.height))
            .line_to((width, row.y + row.height))
    }

    /// Bottom-right corner across the bottom edge to the left edge.
    fn bottom_edge(
        &self,
        info: &RenderInfo,
        data: Data,
        width: f32,
        height: f32,
        radius: f32,
    ) -> Data {
        let data = data
            .line_to((width, height - radius))
            .elliptical_arc_to((radius, radius, 0.0, 0.0, 1.0, width - radius, height));
        let data = if info.has_next() {
            let end = self.constants.notch_offset() + self.constants.notch_width();
            let data = data.line_to((end, height));
            self.notch_left(data, end, height)
        } else {
            data
        };
        data.line_to((radius, height))
            .elliptical_arc_to((radius, radius, 0.0, 0.0, 1.0, 0.0, height - radius))
    }

    /// The notch polyline drawn left-to-right starting at `x`.
    fn notch_right(&self, data: Data, x: f32, y: f32) -> Data {
        let notch_width = self.constants.notch_width();
        let depth = self.constants.notch_height();
        data.line_to((x, y))
            .line_to((x + notch_width * 0.25, y + depth))
            .line_to((x + notch_width * 0.75, y + depth))
            .line_to((x + notch_width, y))
    }

    /// The notch polyline drawn right-to-left starting at `x`.
    fn notch_left(&self, data: Data, x: f32, y: f32) -> Data {
        let notch_width = self.constants.notch_width();
        let depth = self.constants.notch_height();
        data.line_to((x - notch_width * 0.25, y + depth))
            .line_to((x - notch_width * 0.75, y + depth))
            .line_to((x - notch_width, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_model::{catalog, PortRef, Workspace};
    use std::rc::Rc;

    fn outline_for(kind: &str) -> (Outline, RenderInfo) {
        let mut ws = Workspace::new(Rc::new(catalog::standard()));
        let id = ws.create_block(kind).unwrap();
        let constants = ConstantProvider::default();
        let info = RenderInfo::measure(&ws, &id, &constants).unwrap();
        let outline = Drawer::new(&constants).draw(&info);
        (outline, info)
    }

    fn path_string(outline: &Outline) -> String {
        svg::node::element::Path::new()
            .set("d", outline.data.clone())
            .to_string()
    }

    #[test]
    fn test_outlines_are_closed() {
        for kind in ["control_wait", "event_when_started", "operator_equals", "math_number"] {
            let (outline, _) = outline_for(kind);
            let rendered = path_string(&outline);
            assert!(rendered.contains('z') || rendered.contains('Z'), "open path for {kind}");
        }
    }

    #[test]
    fn test_hat_variants_draw_distinct_top_edges() {
        let (cap, _) = outline_for("event_when_started");
        let (bowler, _) = outline_for("procedures_definition");
        let (plain, _) = outline_for("control_wait");

        let cap = path_string(&cap);
        let bowler = path_string(&bowler);
        let plain = path_string(&plain);
        // The cap is the only top edge with a cubic curve.
        assert!(cap.contains('C'));
        assert!(!bowler.contains('C'));
        assert!(!plain.contains('C'));
        assert_ne!(bowler, plain);
    }

    #[test]
    fn test_connections_pass_through_from_measurement() {
        let mut ws = Workspace::new(Rc::new(catalog::standard()));
        let if_block = ws.create_block("control_if").unwrap();
        let constants = ConstantProvider::default();
        let info = RenderInfo::measure(&ws, &if_block, &constants).unwrap();
        let outline = Drawer::new(&constants).draw(&info);

        assert_eq!(outline.connections, info.connections());
        assert!(outline
            .connections
            .iter()
            .any(|c| c.port == PortRef::input(if_block.clone(), "CONDITION") && c.highlight));
    }

    #[test]
    fn test_bowler_keeps_a_straight_right_edge() {
        use cairn_model::{BlockDescriptor, InputSpec, Registry};

        let mut registry = Registry::new();
        registry.register(
            BlockDescriptor::new("loop_definition", "procedures")
                .with_hat(HatKind::Bowler)
                .with_next(None)
                .with_input(InputSpec::statement("SUBSTACK")),
        );
        registry.register(
            BlockDescriptor::new("plain_definition", "procedures")
                .with_hat(HatKind::Bowler)
                .with_next(None),
        );
        let mut ws = Workspace::new(Rc::new(registry));
        let wrapping = ws.create_block("loop_definition").unwrap();
        let plain = ws.create_block("plain_definition").unwrap();

        let constants = ConstantProvider::default();
        let drawer = Drawer::new(&constants);
        let wrapping = RenderInfo::measure(&ws, &wrapping, &constants).unwrap();
        assert!(wrapping.rows().iter().any(|row| row.kind == RowKind::Statement));
        let wrapping = drawer.draw(&wrapping);
        let plain = drawer.draw(&RenderInfo::measure(&ws, &plain, &constants).unwrap());

        // No extra segments: the substack sits against an uncarved edge.
        assert_eq!(
            path_string(&wrapping).matches('L').count(),
            path_string(&plain).matches('L').count()
        );
    }

    #[test]
    fn test_statement_row_carves_the_wrap() {
        let (with_substack, info) = outline_for("control_if");
        assert!(info.rows().iter().any(|row| row.kind == RowKind::Statement));
        let (without, _) = outline_for("control_wait");
        // The C-shape adds line segments the plain block does not have.
        let carved = path_string(&with_substack).matches('L').count();
        let plain = path_string(&without).matches('L').count();
        assert!(carved > plain);
    }
}
