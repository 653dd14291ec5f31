/// Dog image handlers
use actix_web::{web, HttpResponse};

use crate::error::{AppError, Result};
use crate::models::DogImageResponse;
use crate::services::DogImageService;

/// Fetch a random image for `breed`, store it, and return its public URL
pub async fn get_random_dog_image(
    service: web::Data<DogImageService>,
    breed: web::Path<String>,
) -> Result<HttpResponse> {
    let breed = breed.into_inner();
    if breed.trim().is_empty() {
        return Err(AppError::BadRequest("breed must not be empty".to_string()));
    }

    let stored = service.fetch_and_store(&breed).await.map_err(|err| {
        tracing::error!(
            %breed,
            code = err.code(),
            source_url = err.source_url(),
            error = %err,
            "dog image pipeline failed"
        );
        AppError::from(err)
    })?;

    Ok(HttpResponse::Ok().json(DogImageResponse {
        image_url: stored.public_url,
        breed,
    }))
}
