//! Test-data seeding for local development, exposed through the `seed` binary.

use uuid::Uuid;

use crate::core::config::Settings;
use crate::core::security;
use crate::core::time::primitive_now_utc;
use crate::db;
use crate::db::types::UserRole;
use crate::repositories;

const SEED_PASSWORD: &str = "Test1234";

const POSITIONS: &[&str] = &["Professor", "Associate Professor", "Senior Lecturer", "Assistant"];
const DEPARTMENTS: &[&str] = &["Computer Science", "Mathematics", "Physics", "Informatics"];
const DEGREES: &[&str] = &["DSc", "PhD", "MSc"];
const MAJORS: &[&str] =
    &["Software Engineering", "Information Systems", "Computer Security", "Applied Mathematics"];

pub async fn run_seed(teachers: u32, students: u32) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    let pool = db::init_pool(&settings).await?;
    db::run_migrations(&pool).await?;

    println!("Creating {teachers} teachers and {students} students...");

    for i in 1..=teachers {
        let username = format!("teacher{i}");
        if seed_user(&pool, &username, UserRole::Teacher, i).await? {
            println!("Created teacher: {username}");
        } else {
            println!("User {username} already exists, skipping");
        }
    }

    for i in 1..=students {
        let username = format!("student{i}");
        if seed_user(&pool, &username, UserRole::Student, i).await? {
            println!("Created student: {username}");
        } else {
            println!("User {username} already exists, skipping");
        }
    }

    println!("Done.");
    Ok(())
}

async fn seed_user(
    pool: &sqlx::PgPool,
    username: &str,
    role: UserRole,
    index: u32,
) -> anyhow::Result<bool> {
    if repositories::users::exists_by_username(pool, username).await?.is_some() {
        return Ok(false);
    }

    let now = primitive_now_utc();
    let hashed_password = security::hash_password(SEED_PASSWORD)?;
    let (first_name, last_name) = match role {
        UserRole::Teacher => (format!("Name{index}"), format!("Teacher{index}")),
        UserRole::Student => (format!("Name{index}"), format!("Student{index}")),
    };

    let user = repositories::users::create_with_profile(
        pool,
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            profile_id: &Uuid::new_v4().to_string(),
            username,
            email: &format!("{username}@example.com"),
            hashed_password,
            first_name: &first_name,
            last_name: &last_name,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;

    let pick = |options: &[&str]| options[index as usize % options.len()].to_string();

    match role {
        UserRole::Teacher => {
            let profile = repositories::profiles::find_teacher_by_user_id(pool, &user.id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("teacher profile missing after creation"))?;
            let position = pick(POSITIONS);
            let department = pick(DEPARTMENTS);
            repositories::profiles::update_teacher(
                pool,
                &profile.id,
                repositories::profiles::UpdateTeacherProfile {
                    bio: Some(format!("{position} at the {department} department")),
                    department: Some(department),
                    position: Some(position),
                    academic_degree: Some(pick(DEGREES)),
                },
            )
            .await?;
        }
        UserRole::Student => {
            let profile = repositories::profiles::find_student_by_user_id(pool, &user.id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("student profile missing after creation"))?;
            let year = (index % 5 + 1) as i32;
            let major = pick(MAJORS);
            repositories::profiles::update_student(
                pool,
                &profile.id,
                repositories::profiles::UpdateStudentProfile {
                    student_code: Some(format!("S{:06}", 100_000 + index)),
                    bio: Some(format!("Year {year} student, {major}")),
                    major: Some(major),
                    year_of_study: Some(year),
                },
            )
            .await?;
        }
    }

    Ok(true)
}
