use crate::{
    api::{
        validate::{self, ValidationErrors},
        ApiError, AuthInfo, ChangeEmailRequest, ImageChange, MemberId, Profile, ProfileUpdate,
    },
    http::{FormPart, Request},
    ApiClient, Plants, Result,
};

fn profile_path(member: MemberId) -> String {
    format!("/api/v1/members/{member}/profile")
}

/// A deleted picture is sent as the literal text `null`
fn profile_parts(update: &ProfileUpdate) -> Vec<FormPart> {
    let mut parts = Vec::new();
    if let Some(n) = &update.nickname {
        parts.push(FormPart::text("nickname", n.clone()));
    }
    if let Some(i) = &update.introduction {
        parts.push(FormPart::text("introduction", i.clone()));
    }
    match &update.image {
        ImageChange::Keep => (),
        ImageChange::Replace(img) => parts.push(FormPart::file(
            "image",
            img.filename.clone(),
            img.mime.clone(),
            img.bytes.clone(),
        )),
        ImageChange::Delete => parts.push(FormPart::text("image", String::from("null"))),
    }
    parts
}

impl ApiClient {
    pub async fn profile(&self, member: MemberId) -> Result<Profile, ApiError> {
        self.fetch(Request::get(profile_path(member))).await
    }

    /// Returns the updated profile when the backend echoes it
    pub async fn update_profile(
        &self,
        member: MemberId,
        update: &ProfileUpdate,
    ) -> Result<Option<Profile>, ApiError> {
        let req = Request::put(profile_path(member)).multipart(profile_parts(update));
        Ok(self.send(req).await?.data)
    }

    pub async fn auth_info(&self, member: MemberId) -> Result<AuthInfo, ApiError> {
        self.fetch(Request::get(format!("/api/v1/members/{member}/auth-info")))
            .await
    }

    pub async fn change_email(
        &self,
        member: MemberId,
        req: &ChangeEmailRequest,
    ) -> Result<(), ApiError> {
        self.execute(Request::post(format!("/api/v1/members/{member}/modify/email")).json(req)?)
            .await
    }
}

impl Plants {
    pub async fn my_profile(&self) -> Result<Profile> {
        let user = self.require_user()?;
        Ok(self.api.profile(user.id).await?)
    }

    /// Saves the profile and mirrors the result into the signed-in user
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile> {
        let user = self.require_user()?;
        if let Some(n) = &update.nickname {
            validate::validate_nickname(n)
                .map_err(|errs| ValidationErrors::single("nickname", errs[0]))?;
        }
        if let ImageChange::Replace(img) = &update.image {
            validate::check_image(img).map_err(|e| ValidationErrors::single("image", e))?;
        }
        let profile = match self.api.update_profile(user.id, update).await? {
            Some(p) => p,
            None => self.api.profile(user.id).await?,
        };
        self.auth().update_user(|u| {
            u.nickname = profile.nickname.clone();
            u.introduction = profile.introduction.clone();
            u.image = profile.image_url.clone();
        });
        tracing::info!(member = %user.id, "profile updated");
        self.modal.snackbar("프로필이 수정되었습니다.");
        Ok(profile)
    }

    pub async fn my_auth_info(&self) -> Result<AuthInfo> {
        let user = self.require_user()?;
        Ok(self.api.auth_info(user.id).await?)
    }

    pub async fn change_email(&self, new_email: &str) -> Result<()> {
        let user = self.require_user()?;
        validate::check_email(new_email).map_err(|e| ValidationErrors::single("newEmail", e))?;
        let req = ChangeEmailRequest {
            current_email: user.email.clone(),
            new_email: String::from(new_email),
        };
        self.api.change_email(user.id, &req).await?;
        self.auth().update_user(|u| u.email = String::from(new_email));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ImageFile;

    fn names(update: &ProfileUpdate) -> Vec<(&'static str, Option<String>, Vec<u8>)> {
        profile_parts(update)
            .into_iter()
            .map(|p| (p.name, p.filename, p.bytes))
            .collect()
    }

    #[test]
    fn only_set_fields_become_parts() {
        assert!(names(&ProfileUpdate::default()).is_empty());
        let parts = names(&ProfileUpdate {
            introduction: Some(String::from("다육이 키워요")),
            ..ProfileUpdate::default()
        });
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].0, "introduction");
    }

    #[test]
    fn image_delete_and_replace() {
        let parts = names(&ProfileUpdate {
            image: ImageChange::Delete,
            ..ProfileUpdate::default()
        });
        assert_eq!(parts, vec![("image", None, b"null".to_vec())]);

        let img = ImageFile::new(String::from("me.png"), vec![1, 2, 3]);
        let parts = names(&ProfileUpdate {
            nickname: Some(String::from("고사리")),
            image: ImageChange::Replace(img),
            ..ProfileUpdate::default()
        });
        assert_eq!(parts[0].0, "nickname");
        assert_eq!(parts[1], ("image", Some(String::from("me.png")), vec![1, 2, 3]));
    }
}
