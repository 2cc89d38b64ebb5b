//! Text exports: a JSON dump of a whole dataset and CSV dumps of views.

use std::io::{Read, Write};

use metasweep_geometry::GeometryKind;
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use super::PersistenceError;
use crate::axis::{Axis, AxisKind};
use crate::dataset::ResultDataset;
use crate::view::{View, PHASE_LABEL, TRANSMITTANCE_LABEL};

#[derive(Debug, Serialize, Deserialize)]
struct DatasetRecord {
    shape_type: String,
    axes: Vec<AxisRecord>,
    transmission_tensor: TensorRecord,
    phase_tensor: TensorRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct AxisRecord {
    name: String,
    #[serde(default)]
    label: String,
    values: Vec<f64>,
}

/// Row-major data plus its shape.
#[derive(Debug, Serialize, Deserialize)]
struct TensorRecord {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl TensorRecord {
    fn from_array(array: &ArrayD<f64>) -> Self {
        Self { shape: array.shape().to_vec(), data: array.iter().copied().collect() }
    }

    fn into_array(self, name: &str) -> Result<ArrayD<f64>, PersistenceError> {
        ArrayD::from_shape_vec(IxDyn(&self.shape), self.data)
            .map_err(|e| PersistenceError::Format(format!("{name}: {e}")))
    }
}

/// Write `dataset` as pretty-printed JSON.
pub fn write_json<W: Write>(writer: W, dataset: &ResultDataset) -> Result<(), PersistenceError> {
    let geometry = dataset.geometry();
    let record = DatasetRecord {
        shape_type: geometry.as_str().to_string(),
        axes: dataset
            .axes()
            .iter()
            .map(|axis| AxisRecord {
                name: axis.name().to_string(),
                label: axis.kind.label(geometry).to_string(),
                values: axis.values().to_vec(),
            })
            .collect(),
        transmission_tensor: TensorRecord::from_array(dataset.transmittance()),
        phase_tensor: TensorRecord::from_array(dataset.phase()),
    };
    serde_json::to_writer_pretty(writer, &record)?;
    Ok(())
}

/// Read a dataset written by [`write_json`]. Labels are informational and
/// are not checked.
pub fn read_json<R: Read>(reader: R) -> Result<ResultDataset, PersistenceError> {
    let record: DatasetRecord = serde_json::from_reader(reader)?;
    let geometry: GeometryKind = record.shape_type.parse()?;
    let axes = record
        .axes
        .into_iter()
        .map(|axis| -> Result<Axis, PersistenceError> {
            let kind: AxisKind = axis.name.parse()?;
            Ok(Axis::from_values(kind, axis.values)?)
        })
        .collect::<Result<Vec<_>, PersistenceError>>()?;
    let transmittance = record.transmission_tensor.into_array("transmission_tensor")?;
    let phase = record.phase_tensor.into_array("phase_tensor")?;
    Ok(ResultDataset::new(geometry, axes, transmittance, phase)?)
}

/// Write a rendered view as CSV with a commented metadata header. Lines
/// have one row per sample; images one row per pixel, x varying fastest.
pub fn write_view_csv<W: Write>(mut writer: W, view: &View) -> Result<(), PersistenceError> {
    writeln!(writer, "# metasweep slice, channel {}", view.channel())?;
    writeln!(writer, "# transmittance: {TRANSMITTANCE_LABEL}, phase: {PHASE_LABEL}")?;
    match view {
        View::Line(line) => {
            writeln!(writer, "# x: {}", line.x_label)?;
            writeln!(writer, "x,transmittance,phase")?;
            for ((x, t), p) in line.x_values.iter().zip(&line.transmittance).zip(&line.phase) {
                writeln!(writer, "{x},{t},{p}")?;
            }
        }
        View::Image(image) => {
            writeln!(writer, "# x: {}", image.x_label)?;
            writeln!(writer, "# y: {}", image.y_label)?;
            writeln!(writer, "x,y,transmittance,phase")?;
            for (row, y) in image.y_values.iter().enumerate() {
                for (col, x) in image.x_values.iter().enumerate() {
                    let t = image.transmittance[[row, col]];
                    let p = image.phase[[row, col]];
                    writeln!(writer, "{x},{y},{t},{p}")?;
                }
            }
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PolarizationChannel;
    use crate::view::{render, SliceSelection};
    use metasweep_geometry::ShapeParameter;

    fn dataset() -> ResultDataset {
        let axes = vec![
            Axis::linspace(AxisKind::Wavelength, 900.0, 1000.0, 2).unwrap(),
            Axis::fixed(AxisKind::Period, 450.0).unwrap(),
            Axis::fixed(AxisKind::Thickness, 600.0).unwrap(),
            Axis::linspace(AxisKind::Shape(ShapeParameter::R), 100.0, 300.0, 3).unwrap(),
            Axis::fixed(AxisKind::Shape(ShapeParameter::HollowR), 50.0).unwrap(),
        ];
        let t = ArrayD::from_shape_fn(IxDyn(&[2, 1, 1, 3, 1, 8]), |ix| 0.1 * (ix[0] + 2 * ix[3]) as f64);
        let p = ArrayD::from_shape_fn(IxDyn(&[2, 1, 1, 3, 1, 8]), |ix| 0.3 * ix[3] as f64 - 1.0 / 3.0);
        ResultDataset::new(GeometryKind::HollowCircle, axes, t, p).unwrap()
    }

    #[test]
    fn test_json_round_trip() {
        let original = dataset();
        let mut buffer = Vec::new();
        write_json(&mut buffer, &original).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.contains("\"shape_type\": \"hollow_circle\""));
        assert!(text.contains("\"Hollow_R\""));
        assert_eq!(read_json(buffer.as_slice()).unwrap(), original);
    }

    #[test]
    fn test_json_rejects_wrong_tensor_length() {
        let mut buffer = Vec::new();
        write_json(&mut buffer, &dataset()).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        value["phase_tensor"]["data"].as_array_mut().unwrap().pop();
        let broken = serde_json::to_vec(&value).unwrap();
        assert!(matches!(read_json(broken.as_slice()), Err(PersistenceError::Format(_))));
    }

    #[test]
    fn test_line_csv() {
        let selection = SliceSelection::line(3, [(0, 0), (1, 0), (2, 0), (4, 0)]);
        let view = render(&dataset(), &selection, PolarizationChannel::Ll).unwrap();
        let mut buffer = Vec::new();
        write_view_csv(&mut buffer, &view).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let rows: Vec<&str> = text.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(rows[0], "x,transmittance,phase");
        assert_eq!(rows.len(), 4);
        assert!(rows[1].starts_with("100,0,0"));
        assert!(text.contains("channel LL"));
    }

    #[test]
    fn test_image_csv_has_one_row_per_pixel() {
        let selection = SliceSelection::new(0, 3, [(1, 0), (2, 0), (4, 0)]);
        let view = render(&dataset(), &selection, PolarizationChannel::Xx).unwrap();
        let mut buffer = Vec::new();
        write_view_csv(&mut buffer, &view).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let rows: Vec<&str> = text.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(rows[0], "x,y,transmittance,phase");
        assert_eq!(rows.len(), 1 + 2 * 3);
        assert!(rows[2].starts_with("1000,100,"));
    }
}
