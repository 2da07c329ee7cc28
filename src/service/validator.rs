//! 转账请求校验
//!
//! 校验失败只在核心内部消化（VALIDATION），不会触达任何外部能力。

use thiserror::Error;

use crate::{
    domain::{to_smallest_unit, Balance, PreparedTransfer, TransferKind, TransferRequest, UnitsError},
    error::ClassifiedError,
    utils::{validate_address, validate_amount, AddressValidator},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid recipient address format")]
    InvalidRecipient,
    #[error("Please enter a valid amount")]
    InvalidAmount,
    #[error("Invalid token contract address")]
    InvalidTokenAddress,
    #[error("Token details are not loaded")]
    TokenNotLoaded,
    #[error("Amount has more decimal places than the token supports ({0})")]
    TooPrecise(u8),
    #[error("Insufficient native token balance")]
    InsufficientNativeBalance,
    #[error("Insufficient token balance")]
    InsufficientTokenBalance,
}

impl From<ValidationError> for ClassifiedError {
    fn from(err: ValidationError) -> Self {
        ClassifiedError::validation(err.to_string())
    }
}

/// 不依赖余额的输入检查（地址、金额格式、代币描述是否就绪）
pub fn check_inputs(request: &TransferRequest) -> Result<(), ValidationError> {
    if !validate_address(&request.recipient) {
        return Err(ValidationError::InvalidRecipient);
    }
    if !validate_amount(&request.amount) {
        return Err(ValidationError::InvalidAmount);
    }
    if request.kind == TransferKind::Erc20 && request.token.is_none() {
        return Err(ValidationError::TokenNotLoaded);
    }
    Ok(())
}

/// 校验请求并换算为最小单位；`balance` 为该请求资产的缓存余额
pub fn check_request(
    request: &TransferRequest,
    balance: &Balance,
) -> Result<PreparedTransfer, ValidationError> {
    check_inputs(request)?;
    let to = AddressValidator::parse(&request.recipient).ok_or(ValidationError::InvalidRecipient)?;

    let (decimals, contract) = match request.kind {
        TransferKind::Native => (balance.decimals, None),
        TransferKind::Erc20 => {
            let token = request.token.as_ref().ok_or(ValidationError::TokenNotLoaded)?;
            (token.decimals, Some(token.contract_address))
        }
    };

    let amount = to_smallest_unit(&request.amount, decimals).map_err(|e| match e {
        UnitsError::TooPrecise(d) => ValidationError::TooPrecise(d),
        UnitsError::Malformed | UnitsError::Overflow => ValidationError::InvalidAmount,
    })?;
    if amount.is_zero() {
        return Err(ValidationError::InvalidAmount);
    }

    if amount > balance.raw {
        return Err(match request.kind {
            TransferKind::Native => ValidationError::InsufficientNativeBalance,
            TransferKind::Erc20 => ValidationError::InsufficientTokenBalance,
        });
    }

    Ok(PreparedTransfer {
        kind: request.kind,
        to,
        amount,
        contract,
    })
}

/// 代币地址输入校验（独立于请求，用于表单实时反馈）
pub fn check_token_address(address: &str) -> Result<(), ValidationError> {
    if validate_address(address) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTokenAddress)
    }
}
