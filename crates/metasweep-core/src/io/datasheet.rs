//! Flat key-value form of a dataset.

use log::warn;
use metasweep_geometry::GeometryKind;
use ndarray::{Array1, ArrayD};

use super::PersistenceError;
use crate::axis::{Axis, AxisKind};
use crate::dataset::ResultDataset;

pub const SHAPE_TYPE: &str = "shape_type";
pub const DIMENSION_NAME: &str = "Dimension_name";
pub const TRANSMISSION_TENSOR: &str = "transmission_tensor";
pub const PHASE_TENSOR: &str = "phase_tensor";

/// One value of a [`DataSheet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Text(String),
    TextList(Vec<String>),
    Array(ArrayD<f64>),
}

impl Field {
    fn kind(&self) -> &'static str {
        match self {
            Field::Text(_) => "text",
            Field::TextList(_) => "a list of text",
            Field::Array(_) => "a numeric array",
        }
    }
}

/// An ordered record of named fields. Keys are unique; inserting an
/// existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSheet {
    entries: Vec<(String, Field)>,
}

impl DataSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Field) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn require(&self, key: &str) -> Result<&Field, PersistenceError> {
        self.get(key).ok_or_else(|| PersistenceError::MissingField(key.to_string()))
    }

    pub fn text(&self, key: &str) -> Result<&str, PersistenceError> {
        match self.require(key)? {
            Field::Text(s) => Ok(s.as_str()),
            // A one-element list is how some writers store a scalar string.
            Field::TextList(list) if list.len() == 1 => Ok(list[0].as_str()),
            _ => Err(PersistenceError::FieldType { key: key.into(), expected: "text" }),
        }
    }

    pub fn text_list(&self, key: &str) -> Result<Vec<String>, PersistenceError> {
        match self.require(key)? {
            Field::TextList(list) => Ok(list.clone()),
            Field::Text(s) => Ok(vec![s.clone()]),
            _ => Err(PersistenceError::FieldType { key: key.into(), expected: "a list of text" }),
        }
    }

    pub fn array(&self, key: &str) -> Result<&ArrayD<f64>, PersistenceError> {
        match self.require(key)? {
            Field::Array(a) => Ok(a),
            other => Err(PersistenceError::FieldType {
                key: format!("{key} (found {})", other.kind()),
                expected: "a numeric array",
            }),
        }
    }

    /// A numeric field holding a vector: `[n]`, `[1, n]` or `[n, 1]`.
    pub fn vector(&self, key: &str) -> Result<Vec<f64>, PersistenceError> {
        let array = self.array(key)?;
        if array.shape().iter().filter(|&&n| n != 1).count() > 1 {
            return Err(PersistenceError::FieldType { key: key.into(), expected: "a vector" });
        }
        Ok(array.iter().copied().collect())
    }
}

impl ResultDataset {
    /// Flatten into the persisted record layout.
    pub fn to_datasheet(&self) -> DataSheet {
        let mut sheet = DataSheet::new();
        sheet.insert(SHAPE_TYPE, Field::Text(self.geometry().as_str().to_string()));
        sheet.insert(
            DIMENSION_NAME,
            Field::TextList(self.labels().into_iter().map(String::from).collect()),
        );
        for axis in self.axes() {
            let values = Array1::from_vec(axis.values().to_vec()).into_dyn();
            sheet.insert(axis.name(), Field::Array(values));
        }
        sheet.insert(TRANSMISSION_TENSOR, Field::Array(self.transmittance().clone()));
        sheet.insert(PHASE_TENSOR, Field::Array(self.phase().clone()));
        sheet
    }

    /// Rebuild a dataset, checking every field it needs. Extra fields are
    /// ignored.
    pub fn from_datasheet(sheet: &DataSheet) -> Result<Self, PersistenceError> {
        let geometry: GeometryKind = sheet.text(SHAPE_TYPE)?.parse()?;
        let kinds = AxisKind::all_for(geometry);

        let labels = sheet.text_list(DIMENSION_NAME)?;
        if labels.len() != kinds.len() {
            return Err(PersistenceError::Format(format!(
                "{DIMENSION_NAME} lists {} axes but a {geometry} dataset has {}",
                labels.len(),
                kinds.len()
            )));
        }
        for (label, kind) in labels.iter().zip(&kinds) {
            if label.trim() != kind.label(geometry) {
                warn!("Axis label '{label}' differs from '{}'", kind.label(geometry));
            }
        }

        let axes = kinds
            .iter()
            .map(|&kind| -> Result<Axis, PersistenceError> {
                Ok(Axis::from_values(kind, sheet.vector(kind.key())?)?)
            })
            .collect::<Result<Vec<_>, PersistenceError>>()?;

        let transmittance = sheet.array(TRANSMISSION_TENSOR)?.clone();
        let phase = sheet.array(PHASE_TENSOR)?.clone();
        Ok(ResultDataset::new(geometry, axes, transmittance, phase)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metasweep_geometry::ShapeParameter;
    use ndarray::IxDyn;

    fn dataset() -> ResultDataset {
        let axes = vec![
            Axis::fixed(AxisKind::Wavelength, 940.0).unwrap(),
            Axis::fixed(AxisKind::Period, 500.0).unwrap(),
            Axis::fixed(AxisKind::Thickness, 500.0).unwrap(),
            Axis::linspace(AxisKind::Shape(ShapeParameter::Wx), 100.0, 300.0, 3).unwrap(),
            Axis::linspace(AxisKind::Shape(ShapeParameter::Theta), 0.0, 90.0, 2).unwrap(),
        ];
        let t = ArrayD::from_shape_fn(IxDyn(&[1, 1, 1, 3, 2, 8]), |ix| ix[3] as f64 * 0.1 + ix[5] as f64);
        let p = ArrayD::from_shape_fn(IxDyn(&[1, 1, 1, 3, 2, 8]), |ix| -(ix[4] as f64) / 3.0);
        ResultDataset::new(GeometryKind::Square, axes, t, p).unwrap()
    }

    #[test]
    fn test_key_layout() {
        let sheet = dataset().to_datasheet();
        let keys: Vec<_> = sheet.keys().collect();
        assert_eq!(
            keys,
            [
                "shape_type",
                "Dimension_name",
                "Wavelength",
                "Period",
                "Thickness",
                "Wx",
                "Theta",
                "transmission_tensor",
                "phase_tensor"
            ]
        );
        assert_eq!(sheet.text("shape_type").unwrap(), "square");
        assert_eq!(sheet.text_list("Dimension_name").unwrap()[3], "W (nm)");
    }

    #[test]
    fn test_round_trip() {
        let original = dataset();
        let restored = ResultDataset::from_datasheet(&original.to_datasheet()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_missing_tensor_is_rejected() {
        let full = dataset().to_datasheet();
        let mut sheet = DataSheet::new();
        for (key, value) in full.iter().filter(|(k, _)| *k != PHASE_TENSOR) {
            sheet.insert(key, value.clone());
        }
        assert!(matches!(
            ResultDataset::from_datasheet(&sheet),
            Err(PersistenceError::MissingField(key)) if key == PHASE_TENSOR
        ));
    }

    #[test]
    fn test_row_vectors_are_accepted() {
        let mut sheet = dataset().to_datasheet();
        let row = ArrayD::from_shape_vec(IxDyn(&[1, 3]), vec![100.0, 200.0, 300.0]).unwrap();
        sheet.insert("Wx", Field::Array(row));
        let restored = ResultDataset::from_datasheet(&sheet).unwrap();
        assert_eq!(restored.axis(3).unwrap().values(), &[100.0, 200.0, 300.0]);
    }

    #[test]
    fn test_unknown_geometry_is_rejected() {
        let mut sheet = dataset().to_datasheet();
        sheet.insert(SHAPE_TYPE, Field::Text("triangle".into()));
        assert!(matches!(
            ResultDataset::from_datasheet(&sheet),
            Err(PersistenceError::Geometry(_))
        ));
    }
}
