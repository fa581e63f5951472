//! Member database operations

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{AppError, Result};

/// Status given to a freshly submitted member
pub const STATUS_PENDING_PAYMENT: &str = "pending_payment";

/// Status given to seeded members unless one is supplied
pub const STATUS_ACTIVE: &str = "active";

/// Member record
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberRecord {
    pub id: i64,
    pub name: String,
    pub membership_no: Option<String>,
    pub active_no: Option<String>,
    pub profession: Option<String>,
    pub designation: Option<String>,
    pub mandal: Option<String>,
    pub dob: Option<String>,
    pub blood_group: Option<String>,
    pub contact_no: String,
    pub address: Option<String>,
    pub pdf_proof_path: Option<String>,
    pub photo_path: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl MemberRecord {
    /// Database id, if the record was actually stored
    pub fn known_id(&self) -> Option<i64> {
        (self.id > 0).then_some(self.id)
    }
}

/// Blood groups accepted on submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APos,
    #[serde(rename = "A-")]
    ANeg,
    #[serde(rename = "B+")]
    BPos,
    #[serde(rename = "B-")]
    BNeg,
    #[serde(rename = "AB+")]
    AbPos,
    #[serde(rename = "AB-")]
    AbNeg,
    #[serde(rename = "O+")]
    OPos,
    #[serde(rename = "O-")]
    ONeg,
}

impl BloodGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APos => "A+",
            BloodGroup::ANeg => "A-",
            BloodGroup::BPos => "B+",
            BloodGroup::BNeg => "B-",
            BloodGroup::AbPos => "AB+",
            BloodGroup::AbNeg => "AB-",
            BloodGroup::OPos => "O+",
            BloodGroup::ONeg => "O-",
        }
    }
}

impl FromStr for BloodGroup {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A+" => Ok(BloodGroup::APos),
            "A-" => Ok(BloodGroup::ANeg),
            "B+" => Ok(BloodGroup::BPos),
            "B-" => Ok(BloodGroup::BNeg),
            "AB+" => Ok(BloodGroup::AbPos),
            "AB-" => Ok(BloodGroup::AbNeg),
            "O+" => Ok(BloodGroup::OPos),
            "O-" => Ok(BloodGroup::ONeg),
            other => Err(format!("Unknown blood group '{}'", other)),
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated member submission
#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub name: String,
    pub profession: Option<String>,
    pub designation: Option<String>,
    pub mandal: Option<String>,
    pub dob: Option<NaiveDate>,
    pub blood_group: Option<BloodGroup>,
    pub contact_no: String,
    pub address: Option<String>,
}

impl NewMember {
    /// Validate submitted form fields. Blank optional fields count as absent.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            fields
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let name = get("name").ok_or_else(|| AppError::BadRequest("Name is required".into()))?;

        let contact_no = get("contact_no")
            .ok_or_else(|| AppError::BadRequest("Contact number is required".into()))?;
        if contact_no.len() != 10 || !contact_no.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::BadRequest(
                "Contact number must be exactly 10 digits".into(),
            ));
        }

        let dob = get("dob")
            .map(|v| {
                NaiveDate::parse_from_str(&v, "%Y-%m-%d").map_err(|_| {
                    AppError::BadRequest(format!("Date of birth '{}' is not YYYY-MM-DD", v))
                })
            })
            .transpose()?;

        let blood_group = get("blood_group")
            .map(|v| v.parse::<BloodGroup>().map_err(AppError::BadRequest))
            .transpose()?;

        Ok(Self {
            name,
            profession: get("profession"),
            designation: get("designation"),
            mandal: get("mandal"),
            dob,
            blood_group,
            contact_no,
            address: get("address"),
        })
    }
}

/// Raw member row for seeding; values are stored as given
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedMember {
    pub name: String,
    pub contact_no: Option<String>,
    pub membership_no: Option<String>,
    pub active_no: Option<String>,
    pub profession: Option<String>,
    pub designation: Option<String>,
    pub mandal: Option<String>,
    pub dob: Option<String>,
    pub blood_group: Option<String>,
    pub address: Option<String>,
    pub photo_path: Option<String>,
    pub pdf_proof_path: Option<String>,
    pub status: Option<String>,
}

/// `BSP-{YYYY}{MM}-{id:06}`
pub fn generate_membership_no(member_id: i64, now: DateTime<Utc>) -> String {
    format!("BSP-{}{:02}-{:06}", now.year(), now.month(), member_id)
}

const MEMBER_COLUMNS: &str = r#"
    id, name, membership_no, active_no, profession, designation, mandal, dob,
    blood_group, contact_no, address, pdf_proof_path, photo_path, status, created_at
"#;

/// Member repository
pub struct MemberRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MemberRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a member by id
    pub async fn get(&self, id: i64) -> Result<Option<MemberRecord>> {
        let member = sqlx::query_as::<_, MemberRecord>(&format!(
            "SELECT {} FROM members WHERE id = ?",
            MEMBER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(member)
    }

    /// Get a member by membership number
    pub async fn get_by_membership_no(&self, membership_no: &str) -> Result<Option<MemberRecord>> {
        let member = sqlx::query_as::<_, MemberRecord>(&format!(
            "SELECT {} FROM members WHERE membership_no = ? ORDER BY id LIMIT 1",
            MEMBER_COLUMNS
        ))
        .bind(membership_no)
        .fetch_optional(self.pool)
        .await?;

        Ok(member)
    }

    /// Look up by id when given, otherwise by membership number
    pub async fn find(
        &self,
        id: Option<i64>,
        membership_no: Option<&str>,
    ) -> Result<Option<MemberRecord>> {
        match (id, membership_no) {
            (Some(id), _) => self.get(id).await,
            (None, Some(number)) => self.get_by_membership_no(number).await,
            (None, None) => Ok(None),
        }
    }

    /// Insert a submitted member with status `pending_payment`
    pub async fn create(
        &self,
        member: &NewMember,
        pdf_proof_path: &str,
        photo_path: &str,
    ) -> Result<MemberRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO members
                (name, profession, designation, mandal, dob, blood_group, contact_no,
                 address, pdf_proof_path, photo_path, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&member.name)
        .bind(&member.profession)
        .bind(&member.designation)
        .bind(&member.mandal)
        .bind(member.dob.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(member.blood_group.map(|b| b.as_str()))
        .bind(&member.contact_no)
        .bind(&member.address)
        .bind(pdf_proof_path)
        .bind(photo_path)
        .bind(STATUS_PENDING_PAYMENT)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!(member_id = id, name = %member.name, "Member created");

        self.get(id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created member".to_string()))
    }

    /// Store the membership number of an existing member
    pub async fn assign_membership_no(&self, id: i64, membership_no: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE members SET membership_no = ? WHERE id = ?")
            .bind(membership_no)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set a member's status. Returns false when the member does not exist.
    pub async fn update_status(&self, id: i64, status: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE members SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a raw row and return its id
    pub async fn seed(&self, member: &SeedMember) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO members
                (name, membership_no, active_no, profession, designation, mandal, dob,
                 blood_group, contact_no, address, pdf_proof_path, photo_path, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&member.name)
        .bind(&member.membership_no)
        .bind(&member.active_no)
        .bind(&member.profession)
        .bind(&member.designation)
        .bind(&member.mandal)
        .bind(&member.dob)
        .bind(&member.blood_group)
        .bind(member.contact_no.as_deref().unwrap_or("0000000000"))
        .bind(&member.address)
        .bind(&member.pdf_proof_path)
        .bind(&member.photo_path)
        .bind(member.status.as_deref().unwrap_or(STATUS_ACTIVE))
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!(member_id = id, name = %member.name, "Member seeded");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use chrono::TimeZone;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid_fields() -> HashMap<String, String> {
        fields(&[
            ("name", "Priya Raman"),
            ("profession", "Teacher"),
            ("designation", ""),
            ("mandal", "Coimbatore South"),
            ("dob", "1990-01-15"),
            ("blood_group", "o+"),
            ("contact_no", "9876543210"),
            ("address", "123, V.H. Road, Coimbatore - 641001"),
        ])
    }

    #[test]
    fn test_membership_number_format() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap();
        assert_eq!(generate_membership_no(42, now), "BSP-202503-000042");
        assert_eq!(generate_membership_no(1234567, now), "BSP-202503-1234567");
    }

    #[test]
    fn test_new_member_validation() {
        let member = NewMember::from_fields(&valid_fields()).unwrap();
        assert_eq!(member.blood_group, Some(BloodGroup::OPos));
        assert_eq!(member.designation, None);
        assert_eq!(member.dob, NaiveDate::from_ymd_opt(1990, 1, 15));

        let mut bad_contact = valid_fields();
        bad_contact.insert("contact_no".into(), "98765".into());
        assert!(matches!(
            NewMember::from_fields(&bad_contact),
            Err(AppError::BadRequest(_))
        ));

        let mut bad_dob = valid_fields();
        bad_dob.insert("dob".into(), "15/01/1990".into());
        assert!(NewMember::from_fields(&bad_dob).is_err());

        let mut bad_blood = valid_fields();
        bad_blood.insert("blood_group".into(), "C+".into());
        assert!(NewMember::from_fields(&bad_blood).is_err());

        let mut no_name = valid_fields();
        no_name.remove("name");
        assert!(NewMember::from_fields(&no_name).is_err());
    }

    #[tokio::test]
    async fn test_create_assign_and_lookup() {
        let pool = memory_pool().await;
        let repo = MemberRepository::new(&pool);
        let member = NewMember::from_fields(&valid_fields()).unwrap();

        let created = repo.create(&member, "/p/doc.pdf", "/p/photo.jpg").await.unwrap();
        assert!(created.known_id().is_some());
        assert_eq!(created.status, STATUS_PENDING_PAYMENT);
        assert_eq!(created.dob.as_deref(), Some("1990-01-15"));
        assert_eq!(created.blood_group.as_deref(), Some("O+"));
        assert_eq!(created.membership_no, None);

        let number = generate_membership_no(created.id, Utc::now());
        assert!(repo.assign_membership_no(created.id, &number).await.unwrap());

        let by_number = repo.get_by_membership_no(&number).await.unwrap().unwrap();
        assert_eq!(by_number.id, created.id);
        assert_eq!(by_number.photo_path.as_deref(), Some("/p/photo.jpg"));

        // id wins over membership number
        let found = repo.find(Some(created.id), Some("BSP-000000-000000")).await.unwrap();
        assert_eq!(found.map(|m| m.id), Some(created.id));
        assert!(repo.find(None, None).await.unwrap().is_none());
        assert!(repo.get(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_status() {
        let pool = memory_pool().await;
        let repo = MemberRepository::new(&pool);
        let id = repo
            .seed(&SeedMember {
                name: "Arun".into(),
                ..SeedMember::default()
            })
            .await
            .unwrap();

        assert!(repo.update_status(id, "paid").await.unwrap());
        assert_eq!(repo.get(id).await.unwrap().unwrap().status, "paid");
        assert!(!repo.update_status(id + 100, "paid").await.unwrap());
    }

    #[tokio::test]
    async fn test_seed_defaults_and_repeated_numbers() {
        let pool = memory_pool().await;
        let repo = MemberRepository::new(&pool);

        let seed = SeedMember {
            name: "Arun".into(),
            membership_no: Some("BSP-202501-000001".into()),
            ..SeedMember::default()
        };
        let id = repo.seed(&seed).await.unwrap();
        let stored = repo.get(id).await.unwrap().unwrap();
        assert_eq!(stored.contact_no, "0000000000");
        assert_eq!(stored.status, STATUS_ACTIVE);

        // Repeated numbers are stored; lookups return the earliest row
        let second = repo.seed(&seed).await.unwrap();
        assert_ne!(second, id);
        let found = repo
            .get_by_membership_no("BSP-202501-000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
    }
}
