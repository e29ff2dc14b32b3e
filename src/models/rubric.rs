use crate::api_error::ApiError;
use crate::schema::{rubric_criteria, rubric_levels, rubrics};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[table_name = "rubrics"]
pub struct Rubric {
    pub id: Uuid,
    pub name: String,
    pub teacher_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[table_name = "rubric_criteria"]
pub struct Criterion {
    pub id: Uuid,
    pub rubric_id: Uuid,
    pub title: String,
    pub position: i32,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[table_name = "rubric_levels"]
pub struct Level {
    pub id: Uuid,
    pub criterion_id: Uuid,
    pub name: String,
    pub score: i32,
    pub description: String,
    pub position: i32,
}

#[derive(Deserialize)]
pub struct RubricInput {
    pub name: String,
    pub criteria: Vec<CriterionInput>,
}

#[derive(Deserialize)]
pub struct CriterionInput {
    pub title: String,
    pub levels: Option<Vec<LevelInput>>,
}

#[derive(Deserialize)]
pub struct LevelInput {
    pub name: Option<String>,
    pub score: Option<i32>,
    pub description: Option<String>,
}

#[derive(Clone, Serialize)]
pub struct RubricDoc {
    pub id: Uuid,
    pub name: String,
    pub teacher_id: Uuid,
    pub max_points: i32,
    pub criteria: Vec<CriterionDoc>,
}

#[derive(Clone, Serialize)]
pub struct CriterionDoc {
    pub id: Uuid,
    pub title: String,
    pub levels: Vec<LevelDoc>,
}

#[derive(Clone, Serialize)]
pub struct LevelDoc {
    pub id: Uuid,
    pub name: String,
    pub score: i32,
    pub description: String,
}

impl Rubric {
    pub fn create(
        conn: &PgConnection,
        input: RubricInput,
        teacher_id: Uuid,
    ) -> Result<RubricDoc, ApiError> {
        validate_name(&input.name)?;

        conn.transaction::<RubricDoc, ApiError, _>(|| {
            let rubric = Rubric {
                id: Uuid::new_v4(),
                name: input.name.clone(),
                teacher_id,
                created_at: Utc::now().naive_utc(),
            };
            let rubric_id = rubric.id;

            diesel::insert_into(rubrics::table)
                .values(rubric)
                .execute(conn)?;

            Rubric::insert_children(conn, rubric_id, &input.criteria)?;

            Rubric::doc(conn, rubric_id)
        })
    }

    pub fn update(
        conn: &PgConnection,
        id: Uuid,
        input: RubricInput,
        teacher_id: Uuid,
    ) -> Result<RubricDoc, ApiError> {
        validate_name(&input.name)?;

        conn.transaction::<RubricDoc, ApiError, _>(|| {
            Rubric::verify_owner(conn, id, teacher_id)?;

            Rubric::delete_children(conn, id)?;

            diesel::update(rubrics::table.filter(rubrics::id.eq(id)))
                .set(rubrics::name.eq(&input.name))
                .execute(conn)?;

            Rubric::insert_children(conn, id, &input.criteria)?;

            Rubric::doc(conn, id)
        })
    }

    pub fn delete(conn: &PgConnection, id: Uuid, teacher_id: Uuid) -> Result<usize, ApiError> {
        conn.transaction::<usize, ApiError, _>(|| {
            Rubric::verify_owner(conn, id, teacher_id)?;

            Rubric::delete_children(conn, id)?;

            let deleted =
                diesel::delete(rubrics::table.filter(rubrics::id.eq(id))).execute(conn)?;

            Ok(deleted)
        })
    }

    pub fn get(conn: &PgConnection, id: Uuid, teacher_id: Uuid) -> Result<RubricDoc, ApiError> {
        Rubric::verify_owner(conn, id, teacher_id)?;

        Rubric::doc(conn, id)
    }

    pub fn list_mine(conn: &PgConnection, teacher_id: Uuid) -> Result<Vec<RubricDoc>, ApiError> {
        let rubrics = rubrics::table
            .filter(rubrics::teacher_id.eq(teacher_id))
            .order(rubrics::created_at.asc())
            .load::<Rubric>(conn)?;

        Rubric::assemble_all(conn, rubrics)
    }

    pub fn list_all(conn: &PgConnection) -> Result<Vec<RubricDoc>, ApiError> {
        let rubrics = rubrics::table
            .order(rubrics::created_at.asc())
            .load::<Rubric>(conn)?;

        Rubric::assemble_all(conn, rubrics)
    }

    pub fn doc(conn: &PgConnection, id: Uuid) -> Result<RubricDoc, ApiError> {
        let rubric = rubrics::table
            .filter(rubrics::id.eq(id))
            .first::<Rubric>(conn)
            .optional()?
            .ok_or_else(|| ApiError::new(404, "Rubric not found".to_string()))?;

        let mut docs = Rubric::assemble_all(conn, vec![rubric])?;

        Ok(docs.remove(0))
    }

    pub fn docs(conn: &PgConnection, ids: &[Uuid]) -> Result<HashMap<Uuid, RubricDoc>, ApiError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rubrics = rubrics::table
            .filter(rubrics::id.eq_any(ids))
            .load::<Rubric>(conn)?;

        let docs = Rubric::assemble_all(conn, rubrics)?;

        Ok(docs.into_iter().map(|doc| (doc.id, doc)).collect())
    }

    fn verify_owner(conn: &PgConnection, id: Uuid, teacher_id: Uuid) -> Result<Rubric, ApiError> {
        let rubric = rubrics::table
            .filter(rubrics::id.eq(id))
            .first::<Rubric>(conn)
            .optional()?
            .ok_or_else(|| ApiError::new(404, "Rubric not found".to_string()))?;

        if rubric.teacher_id != teacher_id {
            warn!("rubric {} access rejected for teacher {}", id, teacher_id);
            return Err(ApiError::new(403, "You do not own this rubric".to_string()));
        }

        Ok(rubric)
    }

    fn insert_children(
        conn: &PgConnection,
        rubric_id: Uuid,
        criteria: &[CriterionInput],
    ) -> Result<(), ApiError> {
        for (position, criterion) in criteria.iter().enumerate() {
            // Criteria without a title or a levels array are skipped, not rejected.
            let levels = match &criterion.levels {
                Some(levels) => levels,
                None => continue,
            };
            if criterion.title.trim().is_empty() {
                continue;
            }

            let row = Criterion {
                id: Uuid::new_v4(),
                rubric_id,
                title: criterion.title.clone(),
                position: position as i32,
            };
            let criterion_id = row.id;

            diesel::insert_into(rubric_criteria::table)
                .values(row)
                .execute(conn)?;

            let rows: Vec<Level> = levels
                .iter()
                .enumerate()
                .filter_map(|(position, level)| {
                    let name = level.name.as_ref().filter(|name| !name.trim().is_empty())?;
                    let score = level.score?;

                    Some(Level {
                        id: Uuid::new_v4(),
                        criterion_id,
                        name: name.clone(),
                        score,
                        description: level.description.clone().unwrap_or_default(),
                        position: position as i32,
                    })
                })
                .collect();

            if !rows.is_empty() {
                diesel::insert_into(rubric_levels::table)
                    .values(&rows)
                    .execute(conn)?;
            }
        }

        Ok(())
    }

    fn delete_children(conn: &PgConnection, rubric_id: Uuid) -> Result<(), ApiError> {
        let criterion_ids: Vec<Uuid> = rubric_criteria::table
            .filter(rubric_criteria::rubric_id.eq(rubric_id))
            .select(rubric_criteria::id)
            .load(conn)?;

        diesel::delete(
            rubric_levels::table.filter(rubric_levels::criterion_id.eq_any(&criterion_ids)),
        )
        .execute(conn)?;

        diesel::delete(rubric_criteria::table.filter(rubric_criteria::rubric_id.eq(rubric_id)))
            .execute(conn)?;

        Ok(())
    }

    fn assemble_all(
        conn: &PgConnection,
        rubrics: Vec<Rubric>,
    ) -> Result<Vec<RubricDoc>, ApiError> {
        let rubric_ids: Vec<Uuid> = rubrics.iter().map(|rubric| rubric.id).collect();

        let criteria: Vec<Criterion> = if rubric_ids.is_empty() {
            Vec::new()
        } else {
            rubric_criteria::table
                .filter(rubric_criteria::rubric_id.eq_any(&rubric_ids))
                .order((rubric_criteria::rubric_id.asc(), rubric_criteria::position.asc()))
                .load(conn)?
        };

        let criterion_ids: Vec<Uuid> = criteria.iter().map(|criterion| criterion.id).collect();
        let levels: Vec<Level> = if criterion_ids.is_empty() {
            Vec::new()
        } else {
            rubric_levels::table
                .filter(rubric_levels::criterion_id.eq_any(&criterion_ids))
                .order((rubric_levels::criterion_id.asc(), rubric_levels::position.asc()))
                .load(conn)?
        };

        let mut levels_by_criterion: HashMap<Uuid, Vec<LevelDoc>> = HashMap::new();
        for level in levels {
            levels_by_criterion
                .entry(level.criterion_id)
                .or_default()
                .push(LevelDoc {
                    id: level.id,
                    name: level.name,
                    score: level.score,
                    description: level.description,
                });
        }

        let mut criteria_by_rubric: HashMap<Uuid, Vec<CriterionDoc>> = HashMap::new();
        for criterion in criteria {
            let levels = levels_by_criterion.remove(&criterion.id).unwrap_or_default();
            criteria_by_rubric
                .entry(criterion.rubric_id)
                .or_default()
                .push(CriterionDoc {
                    id: criterion.id,
                    title: criterion.title,
                    levels,
                });
        }

        Ok(rubrics
            .into_iter()
            .map(|rubric| {
                let criteria = criteria_by_rubric.remove(&rubric.id).unwrap_or_default();
                RubricDoc {
                    id: rubric.id,
                    name: rubric.name,
                    teacher_id: rubric.teacher_id,
                    max_points: max_points(&criteria),
                    criteria,
                }
            })
            .collect())
    }
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::new(400, "Rubric name is required".to_string()));
    }

    Ok(())
}

pub fn max_points(criteria: &[CriterionDoc]) -> i32 {
    criteria
        .iter()
        .map(|criterion| {
            criterion
                .levels
                .iter()
                .map(|level| level.score)
                .max()
                .unwrap_or(0)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criterion(scores: &[i32]) -> CriterionDoc {
        CriterionDoc {
            id: Uuid::new_v4(),
            title: "Structure".to_string(),
            levels: scores
                .iter()
                .map(|&score| LevelDoc {
                    id: Uuid::new_v4(),
                    name: format!("Level {}", score),
                    score,
                    description: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn max_points_sums_best_level_per_criterion() {
        let criteria = vec![criterion(&[3, 7, 10]), criterion(&[1, 5])];

        assert_eq!(max_points(&criteria), 15);
    }

    #[test]
    fn max_points_of_empty_rubric_is_zero() {
        assert_eq!(max_points(&[]), 0);
        assert_eq!(max_points(&[criterion(&[])]), 0);
    }

    #[test]
    fn blank_rubric_names_are_rejected() {
        assert!(validate_name("  ").is_err());
        assert!(validate_name("Essay rubric").is_ok());
    }
}
