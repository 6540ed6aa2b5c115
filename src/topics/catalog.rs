//! Candidate topics: the static summarization catalog and tables of
//! model-produced topics.

use serde::{Deserialize, Serialize};

use crate::corpus::{CorpusError, Table};

/// A label eligible for assignment plus the text used to vectorize it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCandidate {
    /// Human-readable topic name written into output tables.
    pub label: String,
    /// Keywords or description projected into the shared vector space.
    pub text: String,
}

impl TopicCandidate {
    /// Creates a candidate with separate label and text.
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    /// Creates a candidate whose label doubles as its text.
    pub fn from_label(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            text: label.clone(),
            label,
        }
    }
}

/// Predefined topic labels for agricultural research corpora.
const AGRICULTURE_TOPICS: [&str; 99] = [
    "Crop Yield Optimization",
    "Soil Health and Fertility",
    "Climate Resilience",
    "Water Use Efficiency",
    "Sustainable Farming Practices",
    "Food Security and Nutrition",
    "Agricultural Technology",
    "Pest and Disease Management",
    "Irrigation and Water Use",
    "Fertilizer Management",
    "Carbon Sequestration in Agriculture",
    "Precision Agriculture",
    "Agroecology",
    "Biodiversity in Farming",
    "Organic Agriculture",
    "Agroforestry",
    "Soil Erosion Control",
    "Drought Resistance",
    "Weed Management",
    "Livestock Health",
    "Farm Mechanization",
    "Seed Quality Improvement",
    "Agri-Business Models",
    "Climate-Smart Agriculture",
    "Agricultural Education",
    "Crop Rotation Practices",
    "Compost and Manure Use",
    "Sustainable Supply Chains",
    "Pollination and Ecosystem Services",
    "Agricultural Labor Practices",
    "Post-Harvest Loss Reduction",
    "Food System Equity",
    "Agroclimatic Zoning",
    "Integrated Pest Management",
    "Soil Carbon Monitoring",
    "Water Harvesting Techniques",
    "Land Tenure and Access",
    "GMOs and Biotechnology",
    "Digital Agriculture and AI",
    "Farmer Decision Support Tools",
    "Mobile Apps for Agriculture",
    "Satellite Monitoring in Agriculture",
    "Soil Nutrient Monitoring",
    "Regenerative Agriculture",
    "Agricultural Trade and Markets",
    "Crop Diversification",
    "Micro-irrigation Systems",
    "Farmer Cooperatives",
    "Policy and Governance in Agriculture",
    "Youth in Agriculture",
    "Women in Agriculture",
    "Sustainable Land Use",
    "Remote Sensing in Agriculture",
    "Agricultural Waste Management",
    "Plant Breeding",
    "Farming in Marginal Lands",
    "Resilient Crop Varieties",
    "Agri-Finance and Loans",
    "Land Degradation",
    "Climate Adaptation Finance",
    "Hydroponics and Vertical Farming",
    "Urban Agriculture",
    "Soil Salinity Management",
    "Land Use Modeling",
    "Pest Forecasting Systems",
    "Irrigation Infrastructure",
    "Climate Variability Impact",
    "Smallholder Farm Productivity",
    "Nutrition-Sensitive Agriculture",
    "Agri-Insurance",
    "Sustainable Food Systems",
    "Rainfed Agriculture",
    "Crop Modeling and Forecasting",
    "Biofertilizers and Biopesticides",
    "Farmer Knowledge Sharing",
    "Agricultural Value Chains",
    "Agricultural Logistics",
    "Circular Economy in Agriculture",
    "Water Quality in Agriculture",
    "Monitoring Greenhouse Gas Emissions",
    "Land-Use Change Detection",
    "Traceability in Food Systems",
    "Mobile Weather Advisory Services",
    "Farming with Indigenous Knowledge",
    "Farmer-Led Innovation",
    "Food Loss and Waste",
    "Desertification Control",
    "Soil pH and Acidity Management",
    "Adaptation to Flooding",
    "Seed Bank Conservation",
    "Food Distribution Systems",
    "Farm Income Stabilization",
    "Policy for Crop Insurance",
    "Crop Pest Surveillance",
    "Farmer Training Programs",
    "Food Reserves",
    "Agricultural Emissions Reduction",
    "Biosecurity in Agriculture",
    "Pesticide Regulation and Safety",
];

/// An ordered list of candidate topics.
///
/// Order matters: it is the tie-break key when two candidates score equally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicCatalog {
    candidates: Vec<TopicCandidate>,
}

impl TopicCatalog {
    /// Wraps an explicit candidate list.
    #[must_use]
    pub fn new(candidates: Vec<TopicCandidate>) -> Self {
        Self { candidates }
    }

    /// Builds a catalog where each label is also its vectorized text.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(labels.into_iter().map(TopicCandidate::from_label).collect())
    }

    /// Built-in agricultural summarization catalog.
    #[must_use]
    pub fn agriculture() -> Self {
        Self::from_labels(AGRICULTURE_TOPICS)
    }

    /// Reads candidates from two columns of a table, in row order.
    ///
    /// # Errors
    /// Returns `CorpusError::MissingColumn` if either column is absent.
    pub fn from_table(
        table: &Table,
        table_name: &str,
        label_column: &str,
        text_column: &str,
    ) -> Result<Self, CorpusError> {
        let label_index = table.require_column(table_name, label_column)?;
        let text_index = table.require_column(table_name, text_column)?;
        let candidates = table
            .column(label_index)
            .zip(table.column(text_index))
            .map(|(label, text)| TopicCandidate::new(label.trim(), text))
            .collect();
        Ok(Self { candidates })
    }

    /// Candidates in catalog order.
    #[must_use]
    pub fn candidates(&self) -> &[TopicCandidate] {
        &self.candidates
    }

    /// Labels in catalog order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.label.as_str()).collect()
    }

    /// Vectorizable texts in catalog order.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.text.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
