use anyhow::Context;
use indexmap::IndexMap;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::models::{RegistrationRecord, StudentRecord, SubjectGrade};

const STUDENT_COLUMNS: &str = "program, course, class_name, last_name, first_name, gender, \
     date_of_birth, troy_id, vnu_id, grades, imported_at";

const REGISTRATION_COLUMNS: &str = "course, class_name, last_name, first_name, student_id, \
     partner_id, date_of_birth, email, vnu_email, phone, tuition_fee, max_credits, \
     registered_credits, total_subjects, approval_status, approval_details, \
     registered_subjects, imported_at";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn clear_all(pool: &PgPool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM grade_consolidation.students")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM grade_consolidation.registrations")
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn insert_students(pool: &PgPool, students: &[StudentRecord]) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    let query = format!(
        "INSERT INTO grade_consolidation.students ({STUDENT_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
    );

    for student in students {
        let grades: Vec<&SubjectGrade> = student.grades.values().collect();
        sqlx::query(&query)
            .bind(&student.program)
            .bind(&student.course)
            .bind(&student.class_name)
            .bind(&student.last_name)
            .bind(&student.first_name)
            .bind(&student.gender)
            .bind(&student.date_of_birth)
            .bind(&student.troy_id)
            .bind(&student.vnu_id)
            .bind(Json(grades))
            .bind(student.imported_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to insert student {}", student.troy_id))?;
    }

    tx.commit().await?;
    Ok(students.len())
}

pub async fn insert_registrations(
    pool: &PgPool,
    registrations: &[RegistrationRecord],
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    let query = format!(
        "INSERT INTO grade_consolidation.registrations ({REGISTRATION_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
    );

    for registration in registrations {
        sqlx::query(&query)
            .bind(&registration.course)
            .bind(&registration.class_name)
            .bind(&registration.last_name)
            .bind(&registration.first_name)
            .bind(&registration.student_id)
            .bind(&registration.partner_id)
            .bind(&registration.date_of_birth)
            .bind(&registration.email)
            .bind(&registration.vnu_email)
            .bind(&registration.phone)
            .bind(&registration.tuition_fee)
            .bind(registration.max_credits)
            .bind(registration.registered_credits)
            .bind(registration.total_subjects)
            .bind(&registration.approval_status)
            .bind(&registration.approval_details)
            .bind(Json(&registration.registered_subjects))
            .bind(registration.imported_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to insert registration {}", registration.student_id))?;
    }

    tx.commit().await?;
    Ok(registrations.len())
}

/// All students in import order.
pub async fn fetch_students(pool: &PgPool) -> anyhow::Result<Vec<StudentRecord>> {
    let query = format!("SELECT {STUDENT_COLUMNS} FROM grade_consolidation.students ORDER BY id");
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    rows.iter().map(student_from_row).collect()
}

/// All registrations in import order.
pub async fn fetch_registrations(pool: &PgPool) -> anyhow::Result<Vec<RegistrationRecord>> {
    let query = format!(
        "SELECT {REGISTRATION_COLUMNS} FROM grade_consolidation.registrations ORDER BY id"
    );
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    rows.iter().map(registration_from_row).collect()
}

/// Case-insensitive substring search over names, IDs and class.
pub async fn search_students(pool: &PgPool, term: &str) -> anyhow::Result<Vec<StudentRecord>> {
    let query = format!(
        "SELECT {STUDENT_COLUMNS} FROM grade_consolidation.students \
         WHERE (last_name || ' ' || first_name) ILIKE $1 \
            OR troy_id ILIKE $1 OR vnu_id ILIKE $1 OR class_name ILIKE $1 \
         ORDER BY id"
    );
    let rows = sqlx::query(&query)
        .bind(like_pattern(term))
        .fetch_all(pool)
        .await?;
    rows.iter().map(student_from_row).collect()
}

/// Case-insensitive substring search over names, IDs, email and class.
pub async fn search_registrations(
    pool: &PgPool,
    term: &str,
) -> anyhow::Result<Vec<RegistrationRecord>> {
    let query = format!(
        "SELECT {REGISTRATION_COLUMNS} FROM grade_consolidation.registrations \
         WHERE (last_name || ' ' || first_name) ILIKE $1 \
            OR student_id ILIKE $1 OR email ILIKE $1 OR class_name ILIKE $1 \
         ORDER BY id"
    );
    let rows = sqlx::query(&query)
        .bind(like_pattern(term))
        .fetch_all(pool)
        .await?;
    rows.iter().map(registration_from_row).collect()
}

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn student_from_row(row: &PgRow) -> anyhow::Result<StudentRecord> {
    let Json(grades): Json<Vec<SubjectGrade>> = row.try_get("grades")?;
    let troy_id: String = row.try_get("troy_id")?;

    let mut by_subject = IndexMap::new();
    for grade in grades {
        by_subject
            .entry(grade.subject_name().to_string())
            .or_insert(grade);
    }

    Ok(StudentRecord {
        program: row.try_get("program")?,
        course: row.try_get("course")?,
        class_name: row.try_get("class_name")?,
        last_name: row.try_get("last_name")?,
        first_name: row.try_get("first_name")?,
        gender: row.try_get("gender")?,
        date_of_birth: row.try_get("date_of_birth")?,
        troy_id,
        vnu_id: row.try_get("vnu_id")?,
        grades: by_subject,
        imported_at: row.try_get("imported_at")?,
    })
}

fn registration_from_row(row: &PgRow) -> anyhow::Result<RegistrationRecord> {
    let Json(registered_subjects): Json<Vec<String>> = row
        .try_get("registered_subjects")
        .context("registered_subjects is not a JSON array of names")?;

    Ok(RegistrationRecord {
        course: row.try_get("course")?,
        class_name: row.try_get("class_name")?,
        last_name: row.try_get("last_name")?,
        first_name: row.try_get("first_name")?,
        student_id: row.try_get("student_id")?,
        partner_id: row.try_get("partner_id")?,
        date_of_birth: row.try_get("date_of_birth")?,
        email: row.try_get("email")?,
        vnu_email: row.try_get("vnu_email")?,
        phone: row.try_get("phone")?,
        tuition_fee: row.try_get("tuition_fee")?,
        max_credits: row.try_get("max_credits")?,
        registered_credits: row.try_get("registered_credits")?,
        total_subjects: row.try_get("total_subjects")?,
        approval_status: row.try_get("approval_status")?,
        approval_details: row.try_get("approval_details")?,
        registered_subjects,
        imported_at: row.try_get("imported_at")?,
    })
}
