use super::{Id, GALAXY_ORIGIN};
use crate::text::{ObjectHandle, Tree, Value};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A detached position: `x`, `y` and the system (or galaxy) they are
/// relative to
///
/// X grows to the left and Y grows downwards on the galaxy map.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoordsData {
    pub x: f64,
    pub y: f64,
    pub origin: Id,
}

impl CoordsData {
    pub fn new(x: f64, y: f64, origin: Id) -> Self {
        CoordsData { x, y, origin }
    }

    /// A position relative to the galaxy
    pub fn galactic(x: f64, y: f64) -> Self {
        CoordsData::new(x, y, GALAXY_ORIGIN)
    }

    /// Euclidean distance, ignoring origins
    pub fn distance_to(&self, other: &CoordsData) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// The centroid of the points, with the origin of the first
    ///
    /// ```
    /// use stellaris_save::handles::CoordsData;
    /// let points = [CoordsData::galactic(0.0, 0.0), CoordsData::galactic(4.0, 2.0)];
    /// assert_eq!(CoordsData::average(&points), Some(CoordsData::galactic(2.0, 1.0)));
    /// assert_eq!(CoordsData::average(&[]), None);
    /// ```
    pub fn average(points: &[CoordsData]) -> Option<CoordsData> {
        let first = points.first()?;
        let count = points.len() as f64;
        let (sum_x, sum_y) = points
            .iter()
            .fold((0.0, 0.0), |(x, y), p| (x + p.x, y + p.y));
        Some(CoordsData::new(sum_x / count, sum_y / count, first.origin))
    }

    /// Center of the circle passing through three points, with the origin of
    /// the first. `None` when the points are collinear
    ///
    /// ```
    /// use stellaris_save::handles::CoordsData;
    /// let center = CoordsData::circle_center(
    ///     &CoordsData::galactic(0.0, 0.0),
    ///     &CoordsData::galactic(2.0, 0.0),
    ///     &CoordsData::galactic(0.0, 2.0),
    /// );
    /// assert_eq!(center, Some(CoordsData::galactic(1.0, 1.0)));
    /// ```
    pub fn circle_center(a: &CoordsData, b: &CoordsData, c: &CoordsData) -> Option<CoordsData> {
        let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
        if d.abs() < f64::EPSILON {
            return None;
        }

        let a2 = a.x * a.x + a.y * a.y;
        let b2 = b.x * b.x + b.y * b.y;
        let c2 = c.x * c.x + c.y * c.y;
        let x = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
        let y = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
        Some(CoordsData::new(x, y, a.origin))
    }

    /// Writes the position as a new `{ x y origin }` object
    pub fn write(&self, tree: &mut Tree) -> CoordsHandle {
        let object = ObjectHandle::new(tree.new_object());
        object.push(tree, "x", self.x);
        object.push(tree, "y", self.y);
        object.push(tree, "origin", self.origin);
        CoordsHandle(object)
    }
}

/// A `coordinate={ x y origin }` object inside the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordsHandle(ObjectHandle);

impl CoordsHandle {
    pub fn new(object: ObjectHandle) -> Self {
        CoordsHandle(object)
    }

    pub fn object(self) -> ObjectHandle {
        self.0
    }

    fn number(self, tree: &Tree, key: &str) -> Option<f64> {
        self.0.find(tree, key)?.value(tree).as_f64()
    }

    pub fn x(self, tree: &Tree) -> f64 {
        self.number(tree, "x").unwrap_or(0.0)
    }

    pub fn y(self, tree: &Tree) -> f64 {
        self.number(tree, "y").unwrap_or(0.0)
    }

    /// The system the position is relative to, or [`GALAXY_ORIGIN`]
    pub fn origin(self, tree: &Tree) -> Id {
        self.0
            .find(tree, "origin")
            .and_then(|x| x.value(tree).as_id())
            .unwrap_or(GALAXY_ORIGIN)
    }

    pub fn set_x(self, tree: &mut Tree, value: f64) {
        self.0.get(tree, "x").set_value(tree, value);
    }

    pub fn set_y(self, tree: &mut Tree, value: f64) {
        self.0.get(tree, "y").set_value(tree, value);
    }

    pub fn set_origin(self, tree: &mut Tree, value: Id) {
        self.0.get(tree, "origin").set_value(tree, value);
    }

    pub fn data(self, tree: &Tree) -> CoordsData {
        CoordsData::new(self.x(tree), self.y(tree), self.origin(tree))
    }

    /// Overwrites all three fields
    pub fn set(self, tree: &mut Tree, data: &CoordsData) {
        self.set_x(tree, data.x);
        self.set_y(tree, data.y);
        self.set_origin(tree, data.origin);
    }

    pub fn distance_to(self, tree: &Tree, other: &CoordsData) -> f64 {
        self.data(tree).distance_to(other)
    }

    /// Moves the position to an offset from another point. The origin is
    /// left alone
    pub fn set_relative_to(self, tree: &mut Tree, other: &CoordsData, offset_x: f64, offset_y: f64) {
        self.set_x(tree, other.x + offset_x);
        self.set_y(tree, other.y + offset_y);
    }

    /// A detached deep copy living in the same tree
    pub fn copy(self, tree: &mut Tree) -> CoordsHandle {
        CoordsHandle(ObjectHandle::new(tree.copy_object(self.0.id())))
    }

    /// The value to store under a `coordinate` key
    pub fn value(self) -> Value {
        Value::Object(self.0.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{Document, TreeParser};

    fn doc() -> Document {
        TreeParser::new()
            .parse("coordinate={ x=-120.5 y=33 origin=12 }")
            .unwrap()
    }

    fn coords(doc: &Document) -> CoordsHandle {
        let entry = doc.root().find(doc.tree(), "coordinate").unwrap();
        CoordsHandle::new(entry.object(doc.tree()).unwrap())
    }

    #[test]
    fn read_coords() {
        let doc = doc();
        let c = coords(&doc);
        assert_eq!(c.data(doc.tree()), CoordsData::new(-120.5, 33.0, 12));
    }

    #[test]
    fn missing_fields_default_to_galaxy() {
        let mut tree = Tree::new();
        let c = CoordsHandle::new(ObjectHandle::new(tree.new_object()));
        assert_eq!(c.data(&tree), CoordsData::galactic(0.0, 0.0));
    }

    #[test]
    fn relative_move_keeps_origin() {
        let mut doc = doc();
        let c = coords(&doc);
        c.set_relative_to(doc.tree_mut(), &CoordsData::galactic(10.0, 10.0), 5.0, -5.0);
        assert_eq!(c.data(doc.tree()), CoordsData::new(15.0, 5.0, 12));
        assert_eq!(
            doc.to_string(),
            "coordinate={\n\tx=15\n\ty=5\n\torigin=12\n}\n"
        );
    }

    #[test]
    fn copy_is_detached() {
        let mut doc = doc();
        let c = coords(&doc);
        let copy = c.copy(doc.tree_mut());
        copy.set_x(doc.tree_mut(), 1.0);
        assert_eq!(c.x(doc.tree()), -120.5);
        assert_eq!(copy.x(doc.tree()), 1.0);
    }

    #[test]
    fn distance() {
        let a = CoordsData::galactic(0.0, 0.0);
        let b = CoordsData::new(3.0, 4.0, 7);
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn collinear_has_no_center() {
        let a = CoordsData::galactic(0.0, 0.0);
        let b = CoordsData::galactic(1.0, 1.0);
        let c = CoordsData::galactic(2.0, 2.0);
        assert_eq!(CoordsData::circle_center(&a, &b, &c), None);
    }
}
