//! 数值合法性检查
//!
//! 控制循环在发送每一条命令前调用这些函数。任何 NaN/∞ 或非法的
//! 齐次变换都会被视为编程错误，直接返回 [`ProtocolError`]，不做钳位。

use crate::ProtocolError;
use nalgebra::{Matrix3, Matrix4};

/// 旋转矩阵正交性/行列式容差
pub const TRANSFORM_TOLERANCE: f64 = 1e-5;

/// 检查切片中的所有值都是有限值
///
/// 返回第一个非有限值的位置。
#[inline]
pub fn check_finite(field: &'static str, values: &[f64]) -> Result<(), ProtocolError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ProtocolError::NonFinite {
            field,
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}

/// 检查所有值有限且非负
pub fn check_non_negative(field: &'static str, values: &[f64]) -> Result<(), ProtocolError> {
    check_finite(field, values)?;
    match values.iter().position(|v| *v < 0.0) {
        Some(index) => Err(ProtocolError::InvalidParameter {
            param: field,
            reason: format!("element {} is negative ({})", index, values[index]),
        }),
        None => Ok(()),
    }
}

/// 是否为合法的齐次变换（列主序）
///
/// - 最后一行必须严格等于 `[0, 0, 0, 1]`
/// - 左上 3x3 必须是旋转矩阵（`RᵀR = I` 且 `det(R) = 1`，容差 [`TRANSFORM_TOLERANCE`]）
pub fn is_homogeneous_transform(transform: &[f64; 16]) -> bool {
    if transform.iter().any(|v| !v.is_finite()) {
        return false;
    }

    let m = Matrix4::from_column_slice(transform);
    if m[(3, 0)] != 0.0 || m[(3, 1)] != 0.0 || m[(3, 2)] != 0.0 || m[(3, 3)] != 1.0 {
        return false;
    }

    let rotation: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
    let orthogonality_error = (rotation.transpose() * rotation - Matrix3::identity()).amax();

    orthogonality_error < TRANSFORM_TOLERANCE
        && (rotation.determinant() - 1.0).abs() < TRANSFORM_TOLERANCE
}

/// 检查齐次变换，失败时返回带字段名的错误
pub fn check_transform(field: &'static str, transform: &[f64; 16]) -> Result<(), ProtocolError> {
    check_finite(field, transform)?;
    if is_homogeneous_transform(transform) {
        Ok(())
    } else {
        Err(ProtocolError::InvalidTransform { field })
    }
}

/// 检查 3x3 矩阵（列主序）是否对称
pub fn is_symmetric(matrix: &[f64; 9]) -> bool {
    let m = Matrix3::from_column_slice(matrix);
    (m - m.transpose()).amax() < TRANSFORM_TOLERANCE
}
