//! Departments and positions: small named lookups referenced by employees.

use diesel::prelude::*;
use log::info;

use crate::db::{self, DbPool};
use crate::errors::ApiError;
use crate::models::{Department, DepartmentForm, Position, PositionForm};

fn required_name(raw: &str, what: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::ValidationError(format!("{} name is required", what)));
    }
    Ok(trimmed.to_string())
}

pub struct DepartmentService;

impl DepartmentService {
    pub async fn list(pool: &DbPool) -> Result<Vec<Department>, ApiError> {
        db::run(pool, |conn| {
            use crate::schema::departments::dsl::*;
            departments.order(name.asc()).load::<Department>(conn).map_err(ApiError::from)
        })
        .await
    }

    pub async fn create(form: DepartmentForm, pool: &DbPool) -> Result<Department, ApiError> {
        let form = DepartmentForm { name: required_name(&form.name, "Department")? };
        let created = db::run(pool, move |conn| {
            use crate::schema::departments::dsl::*;
            diesel::insert_into(departments)
                .values(&form)
                .get_result::<Department>(conn)
                .map_err(ApiError::from)
        })
        .await?;
        info!("Created department {}", created.name);
        Ok(created)
    }

    pub async fn update(dept_id: i32, form: DepartmentForm, pool: &DbPool) -> Result<Department, ApiError> {
        let form = DepartmentForm { name: required_name(&form.name, "Department")? };
        db::run(pool, move |conn| {
            use crate::schema::departments::dsl::*;
            diesel::update(departments.find(dept_id))
                .set(&form)
                .get_result::<Department>(conn)
                .optional()?
                .ok_or_else(|| ApiError::NotFoundError("Department not found".to_string()))
        })
        .await
    }

    /// Refuses while any employee still belongs to the department.
    pub async fn delete(dept_id: i32, pool: &DbPool) -> Result<(), ApiError> {
        db::run(pool, move |conn| {
            use crate::schema::{departments, employees};
            conn.transaction::<_, ApiError, _>(|conn| {
                let in_use = employees::table
                    .filter(employees::department_id.eq(dept_id))
                    .count()
                    .get_result::<i64>(conn)?;
                if in_use > 0 {
                    return Err(ApiError::ValidationError(format!(
                        "Department is in use by {} employee(s)",
                        in_use
                    )));
                }
                let deleted = diesel::delete(departments::table.find(dept_id)).execute(conn)?;
                if deleted == 0 {
                    return Err(ApiError::NotFoundError("Department not found".to_string()));
                }
                Ok(())
            })
        })
        .await
    }
}

pub struct PositionService;

impl PositionService {
    pub async fn list(pool: &DbPool) -> Result<Vec<Position>, ApiError> {
        db::run(pool, |conn| {
            use crate::schema::positions::dsl::*;
            positions.order(name.asc()).load::<Position>(conn).map_err(ApiError::from)
        })
        .await
    }

    pub async fn create(form: PositionForm, pool: &DbPool) -> Result<Position, ApiError> {
        let form = PositionForm { name: required_name(&form.name, "Position")?, ..form };
        let created = db::run(pool, move |conn| {
            use crate::schema::positions::dsl::*;
            diesel::insert_into(positions)
                .values(&form)
                .get_result::<Position>(conn)
                .map_err(ApiError::from)
        })
        .await?;
        info!("Created position {} (leader: {})", created.name, created.is_leader);
        Ok(created)
    }

    pub async fn update(pos_id: i32, form: PositionForm, pool: &DbPool) -> Result<Position, ApiError> {
        let form = PositionForm { name: required_name(&form.name, "Position")?, ..form };
        db::run(pool, move |conn| {
            use crate::schema::positions::dsl::*;
            diesel::update(positions.find(pos_id))
                .set(&form)
                .get_result::<Position>(conn)
                .optional()?
                .ok_or_else(|| ApiError::NotFoundError("Position not found".to_string()))
        })
        .await
    }

    /// Refuses while any employee still holds the position.
    pub async fn delete(pos_id: i32, pool: &DbPool) -> Result<(), ApiError> {
        db::run(pool, move |conn| {
            use crate::schema::{employees, positions};
            conn.transaction::<_, ApiError, _>(|conn| {
                let in_use = employees::table
                    .filter(employees::position_id.eq(pos_id))
                    .count()
                    .get_result::<i64>(conn)?;
                if in_use > 0 {
                    return Err(ApiError::ValidationError(format!(
                        "Position is in use by {} employee(s)",
                        in_use
                    )));
                }
                let deleted = diesel::delete(positions::table.find(pos_id)).execute(conn)?;
                if deleted == 0 {
                    return Err(ApiError::NotFoundError("Position not found".to_string()));
                }
                Ok(())
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(required_name("  Finance ", "Department").unwrap(), "Finance");
        match required_name("   ", "Position") {
            Err(ApiError::ValidationError(msg)) => assert_eq!(msg, "Position name is required"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
