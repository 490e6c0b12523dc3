use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::checkin::ValidationError;

/// Relationship choices offered for each family member
pub const RELATIONSHIPS: [&str; 8] = [
    "Pai", "Mãe", "Filho(a)", "Irmão(a)", "Avô/Avó", "Tio(a)", "Primo(a)", "Outro",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub enum StructureType {
    #[default]
    #[serde(rename = "pai_mae")]
    FatherAndMother,
    #[serde(rename = "so_pai")]
    FatherOnly,
    #[serde(rename = "so_mae")]
    MotherOnly,
    #[serde(rename = "duas_maes")]
    TwoMothers,
    #[serde(rename = "dois_pais")]
    TwoFathers,
    #[serde(rename = "outro")]
    Other,
}

impl StructureType {
    pub const ALL: [StructureType; 6] = [
        StructureType::FatherAndMother,
        StructureType::FatherOnly,
        StructureType::MotherOnly,
        StructureType::TwoMothers,
        StructureType::TwoFathers,
        StructureType::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StructureType::FatherAndMother => "Pai e Mãe",
            StructureType::FatherOnly => "Só Pai",
            StructureType::MotherOnly => "Só Mãe",
            StructureType::TwoMothers => "Duas Mães",
            StructureType::TwoFathers => "Dois Pais",
            StructureType::Other => "Outro",
        }
    }

    /// Value stored in the backend's `structure_type` column.
    pub fn code(&self) -> &'static str {
        match self {
            StructureType::FatherAndMother => "pai_mae",
            StructureType::FatherOnly => "so_pai",
            StructureType::MotherOnly => "so_mae",
            StructureType::TwoMothers => "duas_maes",
            StructureType::TwoFathers => "dois_pais",
            StructureType::Other => "outro",
        }
    }
}

impl FromStr for StructureType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
        StructureType::ALL
            .into_iter()
            .find(|t| t.code() == wanted)
            .ok_or_else(|| ValidationError::UnknownStructure(s.to_string()))
    }
}

impl fmt::Display for StructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct FamilyMember {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub occupation: String,
    #[serde(default)]
    pub notes: String,
}

/// Family profile ("Perfil"), one row per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct FamilyStructure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub structure_type: StructureType,
    #[serde(default)]
    pub children_count: u32,
    #[serde(default)]
    pub family_members: Vec<FamilyMember>,
    #[serde(default)]
    pub additional_info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl FamilyStructure {
    /// Empty profile shown before the user saves anything.
    pub fn new(user_id: &str) -> Self {
        Self {
            id: None,
            user_id: user_id.to_string(),
            structure_type: StructureType::default(),
            children_count: 1,
            family_members: Vec::new(),
            additional_info: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Append a blank member and return it for editing.
    pub fn add_member(&mut self) -> &mut FamilyMember {
        let mut id = Utc::now().timestamp_millis();
        // Two adds within the same millisecond still need distinct ids
        while self.family_members.iter().any(|m| m.id == id.to_string()) {
            id += 1;
        }

        self.family_members.push(FamilyMember {
            id: id.to_string(),
            name: String::new(),
            relationship: RELATIONSHIPS[0].to_string(),
            age: 0,
            occupation: String::new(),
            notes: String::new(),
        });
        let last = self.family_members.len() - 1;
        &mut self.family_members[last]
    }

    pub fn member_mut(&mut self, id: &str) -> Option<&mut FamilyMember> {
        self.family_members.iter_mut().find(|m| m.id == id)
    }

    /// Remove the member with `id`, returning whether one was removed.
    pub fn remove_member(&mut self, id: &str) -> bool {
        let before = self.family_members.len();
        self.family_members.retain(|m| m.id != id);
        self.family_members.len() != before
    }

    /// Stamp `updated_at` ahead of a save.
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now().to_rfc3339());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structure_type_uses_backend_values() {
        let value = serde_json::to_value(StructureType::TwoMothers).unwrap();
        assert_eq!(value, json!("duas_maes"));
        let parsed: StructureType = serde_json::from_value(json!("so_pai")).unwrap();
        assert_eq!(parsed, StructureType::FatherOnly);
        assert_eq!(parsed.label(), "Só Pai");
    }

    #[test]
    fn test_structure_type_from_str() {
        assert_eq!("dois-pais".parse::<StructureType>(), Ok(StructureType::TwoFathers));
        assert_eq!(" PAI_MAE ".parse::<StructureType>(), Ok(StructureType::FatherAndMother));
        assert!(matches!(
            "avós".parse::<StructureType>(),
            Err(ValidationError::UnknownStructure(_))
        ));
    }

    #[test]
    fn test_members_add_update_remove() {
        let mut family = FamilyStructure::new("u-1");
        let first = family.add_member().id.clone();
        let second = family.add_member().id.clone();
        assert_ne!(first, second);
        assert_eq!(family.family_members[0].relationship, "Pai");

        family.member_mut(&second).unwrap().name = "Lia".to_string();
        assert_eq!(family.family_members[1].name, "Lia");

        assert!(family.remove_member(&first));
        assert!(!family.remove_member(&first));
        assert_eq!(family.family_members.len(), 1);
        assert_eq!(family.family_members[0].id, second);
    }

    #[test]
    fn test_deserialize_partial_row() {
        let family: FamilyStructure = serde_json::from_value(json!({
            "id": "f-1",
            "user_id": "u-1",
            "structure_type": "outro",
            "children_count": 2
        }))
        .unwrap();
        assert_eq!(family.structure_type, StructureType::Other);
        assert!(family.family_members.is_empty());
        assert_eq!(family.additional_info, "");
    }
}
