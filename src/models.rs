use std::fmt;
use std::io::Write;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::NaiveDateTime;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize, Serializer};

/// Declares an enum stored as a text column, with its wire/database spelling.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("Invalid {} value: {}", stringify!($name), other)),
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let text = std::str::from_utf8(bytes.as_bytes())?;
                text.parse::<$name>().map_err(Into::into)
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow, Serialize, Deserialize)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum EmploymentType {
    Regular,
    Contractual,
    Probationary,
}

text_enum!(EmploymentType {
    Regular => "regular",
    Contractual => "contractual",
    Probationary => "probationary",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow, Serialize, Deserialize)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    Active,
    Inactive,
    Resigned,
}

text_enum!(EmployeeStatus {
    Active => "active",
    Inactive => "inactive",
    Resigned => "resigned",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow, Serialize, Deserialize)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogType {
    In,
    Out,
}

text_enum!(LogType {
    In => "IN",
    Out => "OUT",
});

fn serialize_photo<S: Serializer>(photo: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match photo {
        Some(bytes) => serializer.serialize_some(&BASE64.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

#[derive(Queryable, Serialize, Debug, Clone)]
pub struct Department {
    pub id: i32,
    pub name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, AsChangeset, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::departments)]
pub struct DepartmentForm {
    pub name: String,
}

#[derive(Queryable, Serialize, Debug, Clone)]
pub struct Position {
    pub id: i32,
    pub name: String,
    pub is_leader: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, AsChangeset, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::positions)]
pub struct PositionForm {
    pub name: String,
    #[serde(default)]
    pub is_leader: bool,
}

#[derive(Queryable, Serialize, Debug, Clone)]
pub struct Employee {
    #[serde(skip_serializing)]
    pub id: i32,
    pub ashima_id: String,
    pub name: String,
    pub department_id: Option<i32>,
    pub position_id: Option<i32>,
    pub supervisor_id: Option<String>,
    pub rfid_tag: Option<String>,
    #[serde(serialize_with = "serialize_photo")]
    pub photo: Option<Vec<u8>>,
    pub employment_type: EmploymentType,
    pub status: EmployeeStatus,
    pub last_active: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Column values written on create and on full update.
#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::employees, treat_none_as_null = true)]
pub struct EmployeeRecord {
    pub ashima_id: String,
    pub name: String,
    pub department_id: Option<i32>,
    pub position_id: Option<i32>,
    pub supervisor_id: Option<String>,
    pub rfid_tag: Option<String>,
    pub photo: Option<Vec<u8>>,
    pub employment_type: EmploymentType,
    pub status: EmployeeStatus,
}

#[derive(Queryable, Serialize, Debug, Clone)]
pub struct AttendanceLog {
    pub id: i32,
    pub ashima_id: String,
    pub log_type: LogType,
    pub logged_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::attendance_logs)]
pub struct NewAttendanceLog {
    pub ashima_id: String,
    pub log_type: LogType,
    pub logged_at: NaiveDateTime,
}

#[derive(Queryable, Serialize, Debug, Clone)]
pub struct AdminUser {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub employee_id: Option<String>,
    pub last_login: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::admin_users)]
pub struct NewAdminUser {
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub employee_id: Option<String>,
}

#[derive(Queryable, Serialize, Debug, Clone)]
pub struct RolePermission {
    pub role: String,
    pub module: String,
    pub permission: serde_json::Value,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// DTOs
#[derive(Deserialize, Debug, Clone, Default)]
pub struct EmployeeRequest {
    pub ashima_id: Option<String>,
    pub name: Option<String>,
    pub department_id: Option<i32>,
    pub position_id: Option<i32>,
    // Older admin forms post `leader`
    #[serde(alias = "leader")]
    pub supervisor_id: Option<String>,
    pub rfid_tag: Option<String>,
    /// Base64 image, optionally prefixed with a `data:` URL header.
    pub photo: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub status: Option<EmployeeStatus>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct EmployeeFilter {
    pub department_id: Option<i32>,
    pub position_id: Option<i32>,
    pub leader: Option<String>,
    pub status: Option<EmployeeStatus>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct AttendanceLogFilter {
    pub ashima_id: Option<String>,
    pub log_type: Option<LogType>,
    pub from: Option<chrono::NaiveDate>,
    pub to: Option<chrono::NaiveDate>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Deserialize, Debug)]
pub struct ScanRequest {
    pub rfid_tag: Option<String>,
}

/// Kiosk view of an employee after a scan.
#[derive(Serialize, Debug)]
pub struct EmployeeProfile {
    #[serde(flatten)]
    pub employee: Employee,
    pub department: Option<String>,
    pub position: Option<String>,
    pub last_in: Option<NaiveDateTime>,
    pub last_out: Option<NaiveDateTime>,
}

#[derive(Serialize, Debug)]
pub struct ScanResult {
    pub employee: EmployeeProfile,
    #[serde(rename = "logType")]
    pub log_type: LogType,
}

#[derive(Deserialize, Debug)]
pub struct CreateAccountRequest {
    pub username: String,
    pub password: String,
    pub role: String,
    pub employee_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateAccountRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub employee_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub account: AdminUser,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: String,      // Subject (account id)
    pub exp: usize,       // Expiration time
    pub iat: usize,       // Issued at
    pub account_id: i32,
    pub username: String,
    pub role: String,
    pub employee_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RolePermissionRequest {
    pub role: String,
    pub module: String,
    pub permission: serde_json::Value,
}

#[derive(Deserialize, Debug)]
pub struct RolePermissionKey {
    pub role: String,
    pub module: String,
}

#[derive(Deserialize, Debug)]
pub struct RoleQuery {
    pub role: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ModuleQuery {
    pub module: String,
}

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct DashboardSummary {
    pub total_employees: i64,
    pub active: i64,
    pub inactive: i64,
    pub resigned: i64,
    pub clocked_in_today: i64,
    pub clocked_out_today: i64,
}
