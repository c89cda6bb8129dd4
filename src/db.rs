use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{
    CatalogEntry, GradeCategory, GradeMark, GradeRecord, GradeScale, StudentGradeProfile,
    StudentRecord, WeightConfig, YearLevel,
};

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn upsert_student(
    pool: &SqlitePool,
    full_name: &str,
    email: &str,
    track: &str,
    current_year: YearLevel,
) -> anyhow::Result<Uuid> {
    let id: String = sqlx::query(
        r#"
        INSERT INTO students (id, full_name, email, track, current_year)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (email) DO UPDATE
        SET full_name = excluded.full_name,
            track = excluded.track,
            current_year = excluded.current_year
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(full_name)
    .bind(email)
    .bind(track)
    .bind(current_year.as_str())
    .fetch_one(pool)
    .await?
    .get("id");

    Uuid::parse_str(&id).context("students.id is not a valid uuid")
}

pub async fn seed(pool: &SqlitePool) -> anyhow::Result<()> {
    let offerings = vec![
        ("Medicina", "Universidade de Lisboa", "Lisboa", 190.0, 240, 240, 2025),
        ("Medicina", "Universidade do Porto", "Porto", 188.5, 220, 220, 2025),
        ("Medicina Dentária", "Universidade de Lisboa", "Lisboa", 175.0, 60, 60, 2025),
        (
            "Engenharia Informática",
            "Instituto Superior Técnico",
            "Lisboa",
            170.5,
            310,
            310,
            2025,
        ),
        (
            "Engenharia Informática",
            "Universidade do Minho",
            "Braga",
            0.0,
            200,
            180,
            2025,
        ),
        ("Psicologia", "Universidade de Coimbra", "Coimbra", 152.3, 120, 120, 2025),
    ];

    for (program, institution, region, required, vacancies, placed, cycle_year) in offerings {
        sqlx::query(
            r#"
            INSERT INTO catalog
            (id, program_name, institution_name, region, required_grade, vacancies, placed, cycle_year)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (program_name, institution_name, cycle_year) DO UPDATE
            SET required_grade = excluded.required_grade,
                vacancies = excluded.vacancies,
                placed = excluded.placed,
                region = excluded.region
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(program)
        .bind(institution)
        .bind(region)
        .bind(required)
        .bind(vacancies)
        .bind(placed)
        .bind(cycle_year)
        .execute(pool)
        .await?;
    }

    let student_id = upsert_student(
        pool,
        "Beatriz Santos",
        "beatriz.santos@example.com",
        "Ciências e Tecnologias",
        YearLevel::Twelfth,
    )
    .await?;

    let grades = vec![
        ("Português", 15.0, "zero_to_twenty", "twelfth", "secondary_subject", "seed-g1"),
        ("Matemática A", 17.0, "zero_to_twenty", "twelfth", "secondary_subject", "seed-g2"),
        ("Português (639)", 150.0, "zero_to_two_hundred", "twelfth", "national_exam", "seed-g3"),
        ("Matemática A (635)", 170.0, "zero_to_two_hundred", "twelfth", "national_exam", "seed-g4"),
    ];

    for (name, mark, scale, year_level, category, source_key) in grades {
        sqlx::query(
            r#"
            INSERT INTO grades
            (id, student_id, name, mark, letter, scale, scale_upper_bound, year_level, category, source_key)
            VALUES (?, ?, ?, ?, NULL, ?, NULL, ?, ?, ?)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(student_id.to_string())
        .bind(name)
        .bind(mark)
        .bind(scale)
        .bind(year_level)
        .bind(category)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_student(pool: &SqlitePool, email: &str) -> anyhow::Result<StudentRecord> {
    let row = sqlx::query(
        "SELECT id, full_name, email, track, current_year FROM students WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no student on record for {email}"))?;

    let id: String = row.get("id");
    let current_year: String = row.get("current_year");

    Ok(StudentRecord {
        id: Uuid::parse_str(&id).context("students.id is not a valid uuid")?,
        full_name: row.get("full_name"),
        email: row.get("email"),
        track: row.get("track"),
        current_year: YearLevel::parse(&current_year)
            .with_context(|| format!("unknown year level '{current_year}' in students table"))?,
    })
}

pub async fn fetch_profile(
    pool: &SqlitePool,
    email: &str,
) -> anyhow::Result<(StudentRecord, StudentGradeProfile)> {
    let student = fetch_student(pool, email).await?;

    let rows = sqlx::query(
        "SELECT name, mark, letter, scale, scale_upper_bound, year_level, category \
         FROM grades WHERE student_id = ? ORDER BY rowid",
    )
    .bind(student.id.to_string())
    .fetch_all(pool)
    .await?;

    let mut records = Vec::new();
    for row in rows {
        let name: String = row.get("name");
        let scale_text: String = row.get("scale");
        let year_text: String = row.get("year_level");
        let category_text: String = row.get("category");
        let mark_value: Option<f64> = row.get("mark");
        let letter: Option<String> = row.get("letter");

        let scale = GradeScale::parse(&scale_text)
            .with_context(|| format!("unknown scale '{scale_text}' on grade '{name}'"))?;
        let mark = match (mark_value, letter) {
            (_, Some(letter)) => GradeMark::Letter(letter),
            (Some(value), None) => GradeMark::Numeric(value),
            (None, None) => anyhow::bail!("grade '{name}' has neither a mark nor a letter"),
        };

        records.push(GradeRecord {
            name,
            mark,
            scale,
            scale_upper_bound: row.get("scale_upper_bound"),
            year_level: YearLevel::parse(&year_text)
                .with_context(|| format!("unknown year level '{year_text}' in grades table"))?,
            category: GradeCategory::parse(&category_text)
                .with_context(|| format!("unknown category '{category_text}' in grades table"))?,
        });
    }

    let profile = StudentGradeProfile {
        student_track: student.track.clone(),
        current_year_level: student.current_year,
        records,
    };
    profile.validate()?;

    Ok((student, profile))
}

pub async fn fetch_catalog(pool: &SqlitePool) -> anyhow::Result<Vec<CatalogEntry>> {
    let rows = sqlx::query(
        "SELECT program_name, institution_name, region, required_grade, vacancies, placed, cycle_year \
         FROM catalog ORDER BY program_name, institution_name, cycle_year",
    )
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(CatalogEntry {
            program_name: row.get("program_name"),
            institution_name: row.get("institution_name"),
            region: row.get("region"),
            required_grade: row.get("required_grade"),
            vacancies: row.get("vacancies"),
            placed: row.get("placed"),
            cycle_year: row.get("cycle_year"),
        });
    }

    Ok(entries)
}

/// Loads a flat catalog export. Re-imports refresh existing offerings, so
/// the file can be replayed whenever the upstream dataset is republished.
pub async fn import_catalog_csv(
    pool: &SqlitePool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        program_name: String,
        institution_name: String,
        region: String,
        required_grade: f64,
        vacancies: i64,
        placed: i64,
        cycle_year: i32,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        sqlx::query(
            r#"
            INSERT INTO catalog
            (id, program_name, institution_name, region, required_grade, vacancies, placed, cycle_year)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (program_name, institution_name, cycle_year) DO UPDATE
            SET required_grade = excluded.required_grade,
                vacancies = excluded.vacancies,
                placed = excluded.placed,
                region = excluded.region
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&row.program_name)
        .bind(&row.institution_name)
        .bind(&row.region)
        .bind(row.required_grade)
        .bind(row.vacancies)
        .bind(row.placed)
        .bind(row.cycle_year)
        .execute(pool)
        .await?;
        imported += 1;
    }

    Ok(imported)
}

/// Manual-entry grades for an existing student. Each row is validated
/// against the record schema before anything is written.
pub async fn import_grades_csv(
    pool: &SqlitePool,
    csv_path: &std::path::Path,
    email: &str,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        name: String,
        mark: String,
        scale: String,
        scale_upper_bound: Option<f64>,
        year_level: String,
        category: String,
        source_key: Option<String>,
    }

    let student = fetch_student(pool, email).await?;

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let scale = GradeScale::parse(&row.scale)
            .with_context(|| format!("unknown scale '{}' on row '{}'", row.scale, row.name))?;
        let mark = if scale == GradeScale::Letter {
            GradeMark::Letter(row.mark.clone())
        } else {
            GradeMark::Numeric(row.mark.trim().parse::<f64>().with_context(|| {
                format!("mark '{}' on row '{}' is not a number", row.mark, row.name)
            })?)
        };
        let record = GradeRecord {
            name: row.name,
            mark,
            scale,
            scale_upper_bound: row.scale_upper_bound,
            year_level: YearLevel::parse(&row.year_level).with_context(|| {
                format!("unknown year level '{}' in grade import", row.year_level)
            })?,
            category: GradeCategory::parse(&row.category).with_context(|| {
                format!("unknown category '{}' in grade import", row.category)
            })?,
        };
        record.validate()?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_grade(pool, student.id, &record, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Accepts extraction-service output: a JSON profile checked against the
/// schema, replacing whatever grades the student had on record.
pub async fn import_profile_json(
    pool: &SqlitePool,
    json_path: &std::path::Path,
) -> anyhow::Result<(String, usize)> {
    #[derive(serde::Deserialize)]
    struct ProfileImport {
        full_name: String,
        email: String,
        student_track: String,
        current_year_level: YearLevel,
        records: Vec<GradeRecord>,
    }

    let content = std::fs::read_to_string(json_path)
        .with_context(|| format!("failed to read {}", json_path.display()))?;
    let import: ProfileImport =
        serde_json::from_str(&content).context("profile JSON does not match the grade schema")?;

    let profile = StudentGradeProfile {
        student_track: import.student_track.clone(),
        current_year_level: import.current_year_level,
        records: import.records,
    };
    profile.validate()?;

    let student_id = upsert_student(
        pool,
        &import.full_name,
        &import.email,
        &import.student_track,
        import.current_year_level,
    )
    .await?;

    // Replace-all runs inside one transaction so a failed import cannot
    // leave the student with half a profile or none at all.
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM grades WHERE student_id = ?")
        .bind(student_id.to_string())
        .execute(&mut *tx)
        .await?;

    let mut inserted = 0usize;
    for record in &profile.records {
        let source_key = format!("profile-{}", Uuid::new_v4());
        if insert_grade(&mut *tx, student_id, record, &source_key).await? {
            inserted += 1;
        }
    }

    tx.commit().await?;

    Ok((import.email, inserted))
}

async fn insert_grade<'e, E>(
    executor: E,
    student_id: Uuid,
    record: &GradeRecord,
    source_key: &str,
) -> anyhow::Result<bool>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let (mark, letter) = match &record.mark {
        GradeMark::Numeric(value) => (Some(*value), None),
        GradeMark::Letter(letter) => (None, Some(letter.clone())),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO grades
        (id, student_id, name, mark, letter, scale, scale_upper_bound, year_level, category, source_key)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(student_id.to_string())
    .bind(&record.name)
    .bind(mark)
    .bind(letter)
    .bind(record.scale.as_str())
    .bind(record.scale_upper_bound)
    .bind(record.year_level.as_str())
    .bind(record.category.as_str())
    .bind(source_key)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn save_score(
    pool: &SqlitePool,
    student_id: Uuid,
    score_200: f64,
    weights: &WeightConfig,
    computed_at: NaiveDate,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO scores (id, student_id, score_200, secondary_weight, exam_weight, computed_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(student_id.to_string())
    .bind(score_200)
    .bind(weights.secondary_weight)
    .bind(weights.exam_weight)
    .bind(computed_at.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_recent_scores(
    pool: &SqlitePool,
    student_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<(NaiveDate, f64)>> {
    let rows = sqlx::query(
        "SELECT computed_at, score_200 FROM scores \
         WHERE student_id = ? ORDER BY computed_at DESC, rowid DESC LIMIT ?",
    )
    .bind(student_id.to_string())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut scores = Vec::new();
    for row in rows {
        let computed_at: String = row.get("computed_at");
        let computed_at = NaiveDate::parse_from_str(&computed_at, "%Y-%m-%d")
            .with_context(|| format!("bad computed_at '{computed_at}' in scores table"))?;
        scores.push((computed_at, row.get("score_200")));
    }

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_db(&pool).await.unwrap();
        pool
    }

    fn write_profile_json(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("profile-{}.json", Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    const FULL_PROFILE: &str = r#"{
        "full_name": "Rui Almeida",
        "email": "rui.almeida@example.com",
        "student_track": "Ciências e Tecnologias",
        "current_year_level": "twelfth",
        "records": [
            {"name": "Português", "mark": 15.0, "scale": "zero_to_twenty",
             "year_level": "twelfth", "category": "secondary_subject"},
            {"name": "Matemática A", "mark": 17.0, "scale": "zero_to_twenty",
             "year_level": "twelfth", "category": "secondary_subject"}
        ]
    }"#;

    #[tokio::test]
    async fn profile_import_replaces_previous_grades() {
        let pool = test_pool().await;

        let path = write_profile_json(FULL_PROFILE);
        let (email, inserted) = import_profile_json(&pool, &path).await.unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(inserted, 2);

        let replacement = r#"{
            "full_name": "Rui Almeida",
            "email": "rui.almeida@example.com",
            "student_track": "Ciências e Tecnologias",
            "current_year_level": "twelfth",
            "records": [
                {"name": "Matemática A", "mark": 18.0, "scale": "zero_to_twenty",
                 "year_level": "twelfth", "category": "secondary_subject"}
            ]
        }"#;
        let path = write_profile_json(replacement);
        let (_, inserted) = import_profile_json(&pool, &path).await.unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(inserted, 1);

        let (_, profile) = fetch_profile(&pool, &email).await.unwrap();
        assert_eq!(profile.records.len(), 1);
        assert_eq!(profile.records[0].name, "Matemática A");
        assert_eq!(profile.records[0].mark, GradeMark::Numeric(18.0));
    }

    #[tokio::test]
    async fn failed_profile_import_keeps_prior_grades() {
        let pool = test_pool().await;

        let path = write_profile_json(FULL_PROFILE);
        let (email, _) = import_profile_json(&pool, &path).await.unwrap();
        let _ = std::fs::remove_file(&path);

        // A letter mark tagged with a numeric scale parses as JSON but
        // fails schema validation, so the import must error out without
        // touching the stored grades.
        let broken = r#"{
            "full_name": "Rui Almeida",
            "email": "rui.almeida@example.com",
            "student_track": "Ciências e Tecnologias",
            "current_year_level": "twelfth",
            "records": [
                {"name": "History", "mark": "A", "scale": "gpa",
                 "category": "secondary_subject"}
            ]
        }"#;
        let path = write_profile_json(broken);
        let result = import_profile_json(&pool, &path).await;
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());

        let (_, profile) = fetch_profile(&pool, &email).await.unwrap();
        assert_eq!(profile.records.len(), 2);
        assert_eq!(profile.records[0].name, "Português");
    }
}
