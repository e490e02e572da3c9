use serde::Serialize;

use crate::aggregate::HourlySeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartPanel {
    Temperature,
    Humidity,
    Solar,
    SoilMoisture,
    SoilTension,
}

/// One line on a panel: history column, legend, stroke colour.
#[derive(Debug, Clone, Copy)]
pub struct SeriesSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct YAxis {
    pub begin_at_zero: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ChartPanel {
    pub const ALL: [ChartPanel; 5] = [
        ChartPanel::Temperature,
        ChartPanel::Humidity,
        ChartPanel::Solar,
        ChartPanel::SoilMoisture,
        ChartPanel::SoilTension,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Temperature => "온도",
            Self::Humidity => "습도",
            Self::Solar => "일사량",
            Self::SoilMoisture => "토양 함수율",
            Self::SoilTension => "토양 수분 장력",
        }
    }

    pub fn series(&self) -> &'static [SeriesSpec] {
        match self {
            Self::Temperature => &[
                SeriesSpec { key: "indoor_temp_1", label: "내부 온도", color: "rgb(75, 192, 192)" },
                SeriesSpec { key: "outdoor_temp", label: "외부 온도", color: "rgb(255, 99, 132)" },
            ],
            Self::Humidity => &[
                SeriesSpec { key: "indoor_humidity", label: "내부 습도", color: "rgb(54, 162, 235)" },
                SeriesSpec { key: "outdoor_humidity", label: "외부 습도", color: "rgb(153, 102, 255)" },
            ],
            Self::Solar => &[
                SeriesSpec { key: "indoor_solar", label: "내부 일사량", color: "rgb(255, 206, 86)" },
                SeriesSpec { key: "outdoor_solar", label: "외부 일사량", color: "rgb(255, 159, 64)" },
            ],
            // History has no soil moisture column; the humidity probe stands in.
            Self::SoilMoisture => &[
                SeriesSpec { key: "indoor_humidity", label: "토양 함수율", color: "rgb(255, 206, 86)" },
            ],
            Self::SoilTension => &[
                SeriesSpec { key: "indoor_soil_tension", label: "토양 수분 장력", color: "rgb(255, 159, 64)" },
            ],
        }
    }

    pub fn y_axis(&self) -> YAxis {
        match self {
            Self::Temperature => YAxis { begin_at_zero: false, max: None },
            Self::Humidity => YAxis { begin_at_zero: true, max: Some(100.0) },
            _ => YAxis { begin_at_zero: true, max: None },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataset {
    pub key: String,
    pub label: String,
    pub color: String,
    /// Same length as the chart's labels; `None` marks a gap.
    pub data: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartModel {
    pub panel: ChartPanel,
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
    pub y_axis: YAxis,
}

pub fn build_chart(panel: ChartPanel, series: &HourlySeries) -> ChartModel {
    let datasets = panel
        .series()
        .iter()
        .map(|spec| ChartDataset {
            key: spec.key.to_string(),
            label: spec.label.to_string(),
            color: spec.color.to_string(),
            data: series.aligned(spec.key),
        })
        .collect();

    ChartModel {
        panel,
        title: panel.title().to_string(),
        labels: series.labels(),
        datasets,
        y_axis: panel.y_axis(),
    }
}

pub fn build_all(series: &HourlySeries) -> Vec<ChartModel> {
    ChartPanel::ALL
        .iter()
        .map(|panel| build_chart(*panel, series))
        .collect()
}
